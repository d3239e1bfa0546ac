// Screening LLM prompt templates.

pub const RESUME_PARSE_SYSTEM: &str = "\
You are a smart resume parser. \
You MUST respond with a single valid JSON object only. No markdown fences, no explanations.";

pub const RESUME_PARSE_PROMPT: &str = r#"Extract all relevant information from the resume text below and return a structured, complete JSON object.

RESUME TEXT:
{resume_text}

RULES:
1. The output must be valid JSON.
2. Include every clearly identified field: name, email, phone, skills, education, experience, projects, certifications, languages, links.
3. Skip fields missing from the resume. Do not insert null or empty values.
4. Use intuitive snake_case field names. The candidate's full name goes in "name".
5. Use lists for repeated fields (skills, education, experience).
6. Keep text clean: no newlines or redundant whitespace.

Return ONLY the JSON object."#;

pub const SCORING_SYSTEM: &str = "\
You are an impartial technical recruiter scoring candidates against a job description. \
You MUST respond with valid JSON only. No markdown fences, no explanations. \
All scores are integers from 0 to 100.";

pub const SCORING_PROMPT: &str = r#"Compare this structured resume data against the job description.

JOB DESCRIPTION:
{job_description}

CANDIDATE RESUME DATA:
{resume_json}

Return exactly this format:
{
  "match_score": 85,
  "skill_match_score": 90,
  "experience_match_score": 80,
  "education_match_score": 85,
  "skillset_for_role": ["skill1", "skill2"],
  "overall_fit": "perfect" | "high" | "low" | "very low"
}"#;
