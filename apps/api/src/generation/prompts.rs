// Prompt constants for résumé and cover-letter generation.
// Templates carry `{placeholder}` markers filled by the builders in generator.rs.

/// System prompt for résumé generation, JSON-only output.
pub const RESUME_SYSTEM: &str = "You are an elite executive career strategist and ATS algorithm expert. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Résumé generation prompt. Replace `{intro}`, `{raw_text}`, `{job_description}`
/// and `{industry_trends}` before sending.
pub const RESUME_PROMPT_TEMPLATE: &str = r#"Create a high-converting, top 1% resume that is strictly optimized for a SINGLE PAGE.

{intro}
--- RAW RESUME INFORMATION ---
{raw_text}
--- END RAW RESUME INFORMATION ---
{job_description}
{industry_trends}

ATS COMPLIANCE RULES:
1. Standard headers: use "Experience", "Education", "Skills", "Summary". No creative headers.
2. Keyword optimization: integrate keywords from the job description into the bullet points.
3. Strict one-page constraint: prioritize ruthlessly.
4. Bullet structure: every bullet follows Action + Context + Result (metric) and starts with a strong verb.
5. Infer missing skills: if experience implies a skill ("Managed project budget" -> "Budgeting & Cost Control"), add it to skills.
6. Headshot prompt: describe a professional headshot for an image generator.

Return a JSON object with this EXACT schema:
{
  "name": "string",
  "jobTitle": "string (optional)",
  "contact": {"email": "", "phone": "", "location": "", "linkedin": "", "portfolio": ""},
  "summary": "string, two to three lines at most",
  "experience": [{"company": "", "role": "", "dates": "", "responsibilities": ["..."]}],
  "education": [{"institution": "", "degree": "", "details": ""}],
  "licensesCertifications": [{"name": "", "issuer": "", "date": ""}],
  "skills": ["top 12-15 most relevant hard skills"],
  "tailoringKeywords": ["..."],
  "tailoringStrength": "Excellent | Good | Fair",
  "jobMatchAnalysis": {"matchScore": 0, "strengths": ["..."], "gaps": ["..."]},
  "suggestedHeadshotPrompt": "string"
}"#;

pub const RESUME_INTRO: &str = "Analyze the following raw resume information provided by the user:";

/// Revision block used instead of `RESUME_INTRO` when a prior suggestion is applied.
/// Replace `{original_gap}` and `{ai_suggestion}`.
pub const REVISION_TEMPLATE: &str = r#"--- REVISION CONTEXT ---
You are revising a previously generated resume based on an AI suggestion.
The original identified gap was: "{original_gap}"
The suggestion to address this gap was: "{ai_suggestion}"
Regenerate the entire resume, incorporating this suggestion to address the gap.
Keep it concise, ATS-friendly and fit for a premium one-page layout.
Re-evaluate tailoringKeywords, tailoringStrength and jobMatchAnalysis for the revised version.
--- END REVISION CONTEXT ---"#;

pub const JOB_DESCRIPTION_TEMPLATE: &str = r#"--- RELEVANT JOB DESCRIPTION (for tailoring content and job match analysis) ---
{job_description}
--- END JOB DESCRIPTION ---"#;

pub const TRENDS_TEMPLATE: &str = r#"--- INDUSTRY TRENDS ---
Use these keywords if relevant to the candidate's experience: {industry_trends}
--- END TRENDS ---"#;

/// System prompt for cover letters: plain text, streamed.
pub const COVER_LETTER_SYSTEM: &str = "You are an expert cover letter writer. \
    Respond with the letter body as plain text only. \
    Do NOT use markdown, headings or placeholders for the sender's address.";

/// Cover letter prompt. Replace `{candidate}`, `{job_description}` and `{tone}`.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a modern, impactful cover letter.

Candidate:
{candidate}

Job:
{job_description}

Tone: {tone}

Structure:
1. Hook: why I am writing and why I am unique.
2. Proof: specific evidence I can do the job, mapping resume skills to job needs.
3. Closing: a call to action.

Keep it under 300 words. Return plain text only."#;

/// Sampling temperature for cover letters.
pub const COVER_LETTER_TEMPERATURE: f32 = 0.7;

/// How many experience entries the cover letter prompt summarizes.
pub const COVER_LETTER_HIGHLIGHTS: usize = 3;

/// System prompt for short plain-text coaching answers.
pub const COACH_SYSTEM: &str = "You are an expert career coach. \
    Respond with plain text only. \
    Do NOT use markdown, headings or preambles.";

/// System prompt for structured analysis, JSON-only output.
pub const ANALYST_SYSTEM: &str = "You are a strict applicant tracking system and hiring analyst. \
    You MUST respond with valid JSON only. \
    Do NOT use markdown code fences or include any text outside the JSON.";

/// Gap suggestion prompt. Replace `{resume_context}` and `{gap}`.
pub const GAP_SUGGESTION_TEMPLATE: &str = r#"Gap analysis task.
Resume context: {resume_context}
Gap: "{gap}"
Job requirement: inferred from the gap.

Provide ONE high-impact revision or addition (1-2 sentences) to close this gap.
It could be a new bullet point, a skill addition, or a summary tweak.
Return ONLY the suggestion text."#;

pub const GAP_SUGGESTION_TEMPERATURE: f32 = 0.5;

/// Skills quoted in the gap suggestion context.
pub const GAP_SUGGESTION_SKILLS: usize = 5;

/// ATS audit prompt. Replace `{resume_json}` and `{job_description}`.
pub const ATS_AUDIT_TEMPLATE: &str = r#"Act as a strict applicant tracking system (e.g. Taleo, Greenhouse).

Analyze the following structured resume data against the target job description.
Resume JSON: {resume_json}
Job description: {job_description}

Conduct a technical audit:
1. Parseability score: rate from 0-100 how easily a machine can extract the core entities (name, contact, role, skills). The input is JSON, so judge the content quality (standard date formats, standard headers).
2. Keyword match: identify critical keywords from the job description that are MISSING in the resume.
3. Formatting check: identify red flags in the text content (non-standard characters, vague dates).
4. Human review status: based on the score, will this be "Auto-Reject", "Review", or "Priority"?

Return a JSON object with this EXACT schema:
{
  "parseabilityScore": 0,
  "missingCriticalKeywords": ["..."],
  "formattingIssues": ["..."],
  "sectionHeaderStandardization": "Pass | Fail",
  "estimatedHumanReviewStatus": "Auto-Reject | Review | Priority"
}"#;

/// Job description characters quoted in the ATS audit prompt.
pub const ATS_JOB_DESCRIPTION_CHARS: usize = 1000;

/// Interview question prompt. Replace `{job_title}`, `{skills}` and `{job_description}`.
pub const INTERVIEW_QUESTIONS_TEMPLATE: &str = r#"Generate 5 tough, role-specific interview questions based on:
Resume: {job_title}, Skills: {skills}
Job: {job_description}

Return a JSON array of strings."#;

pub const INTERVIEW_QUESTIONS_TEMPERATURE: f32 = 0.5;

/// Job description characters quoted in the interview question prompt.
pub const INTERVIEW_JOB_DESCRIPTION_CHARS: usize = 500;

/// Industry trends prompt. Replace `{job_title}` and `{year}`.
pub const TRENDS_RESEARCH_TEMPLATE: &str = r#"What are the top 3 current trends, keywords, and critical technologies for a "{job_title}" role in {year}? Provide a concise list of keywords that should be on a resume."#;
