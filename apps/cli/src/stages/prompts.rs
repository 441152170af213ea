// All LLM prompt constants for the pipeline stages.
// Reuses cross-cutting fragments from llm_client::prompts.
// The refactor stage is deterministic and has no prompt.

/// System prompt for job-posting extraction — enforces JSON-only output.
pub const JOB_ANALYSIS_SYSTEM: &str = "You are an expert job posting analyst. \
    Parse a raw job posting and extract structured information. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Job extraction prompt template. Replace `{job_content}` before sending.
pub const JOB_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze this job posting and return a JSON object with this EXACT schema (no extra fields):
{
  "title": "Senior Rust Engineer",
  "company": "Acme",
  "required_skills": ["Rust", "Tokio"],
  "responsibilities": ["Design and operate backend services"],
  "keywords": ["Rust", "Tokio", "distributed systems", "reliability"]
}

Rules:
- "required_skills": explicit must-haves only — phrases like "required", "must have", minimum years.
- "responsibilities": in the order the posting lists them.
- "keywords": every meaningful term an applicant-tracking system would match on,
  derived from the required skills and responsibilities text. Always a superset
  of the required skills.
- Unknown scalar fields: use an empty string. Unknown lists: use an empty list.

JOB POSTING CONTENT:
---
{job_content}
---

Return only valid JSON."#;

/// System prompt for company-brief synthesis.
pub const RESEARCH_SYSTEM: &str = "You are a business intelligence researcher. \
    Given search results about a company, extract key facts useful for \
    tailoring a job application. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Company-brief prompt template.
/// Replace: {company_name}, {search_results}
pub const RESEARCH_PROMPT_TEMPLATE: &str = r#"Based on the following search results about {company_name}, produce a structured company brief as JSON with this EXACT schema:
{
  "mission": "1-2 sentence mission statement or description",
  "tech_stack": ["technology 1"],
  "culture_notes": ["evidence-backed note about engineering culture"],
  "recent_news": [
    {"headline": "...", "date": "2026-03-12", "source_url": "https://..."}
  ]
}

Rules:
- Only claim facts supported by the search results; leave collections empty otherwise.
- "date" must be YYYY-MM-DD or null — never a free-form phrase.
- "source_url" must be one of the result URLs below.

SEARCH RESULTS:
---
{search_results}
---

Return only valid JSON."#;

/// System prompt for edit-plan strategy.
pub const STRATEGY_SYSTEM: &str = "You are an expert resume strategist. \
    You compare a job's requirements against a LaTeX resume and produce a \
    precise, surgical edit plan. Every directive must close a specific gap \
    between the job profile and the resume. \
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences.";

/// Strategy prompt template.
/// Replace: {exact_quote_instruction}, {job_profile_json}, {company_brief_json}, {resume_latex}
pub const STRATEGY_PROMPT_TEMPLATE: &str = r#"You are tailoring a candidate's resume for a specific job.

{exact_quote_instruction}

JOB PROFILE:
{job_profile_json}

COMPANY BRIEF (may be empty if research found little):
{company_brief_json}

CURRENT LATEX RESUME (source of truth for original_text):
{resume_latex}

Produce an edit plan as a JSON ARRAY of directives:
[
  {
    "target_section": "Experience",
    "operation": "REWRITE_BULLET",
    "original_text": "exact text copied verbatim from the resume",
    "new_text": "improved version mirroring the job's language",
    "justification": "which required skill or keyword gap this closes"
  }
]

Operations:
- "REWRITE_BULLET": replace an existing bullet. original_text REQUIRED, verbatim.
- "REMOVE_BULLET": delete an irrelevant bullet. original_text REQUIRED, verbatim.
- "ADD_BULLET": add a new bullet to target_section. original_text omitted.
- "INJECT_KEYWORD": weave a missing keyword into target_section. If anchoring on
  existing text, include it verbatim as original_text and put the reworded phrase
  in new_text; otherwise omit original_text and put the bare keyword in new_text.

HARD RULES:
1. Every directive's justification must name the specific gap it closes.
2. Only suggest changes that genuinely improve fit for this job — no rewrites for taste.
3. Never invent experience the resume does not support.
4. target_section must name a section heading that exists in the resume.

Return only the JSON array."#;

/// System prompt for cover-letter writing — output is a LaTeX document, not JSON.
pub const COVER_LETTER_SYSTEM: &str = "You are an expert cover letter writer. \
    You write compelling, personalized cover letters that open with a strong \
    hook, reference specific company details, connect the candidate's \
    experience to the job requirements, and stay concise (3-4 paragraphs, \
    300-400 words). \
    Return ONLY a complete, valid LaTeX document. \
    No markdown fences, no explanation.";

/// Cover-letter prompt template.
/// Replace: {job_title}, {company_name}, {required_skills}, {company_brief_json},
///          {edit_summary}, {resume_summary}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a cover letter for this candidate applying to this role.

JOB:
- Title: {job_title}
- Company: {company_name}
- Key requirements: {required_skills}

COMPANY CONTEXT:
{company_brief_json}

TAILORING ANGLE (how the resume was adjusted for this job):
{edit_summary}

CANDIDATE BACKGROUND (extracted from their tailored resume):
{resume_summary}

Produce a complete LaTeX document using this structure:

\documentclass[11pt,letterpaper]{letter}
\usepackage[margin=1in]{geometry}

\begin{document}

\begin{letter}{Hiring Manager \\ {company_name}}

\opening{Dear Hiring Manager,}

[3-4 paragraphs]

\closing{Sincerely,}

\end{letter}
\end{document}

Write the full document. Return only LaTeX, no markdown fences."#;
