//! Fixed question catalog and the instruction texts sent to the AI service.
//!
//! Everything here is static data plus the pure functions that turn an answer
//! set into the prompts for the two gateway operations.

pub const GREETING: &str = "Hello! I'm your AI Risk-Based Decision Assistant. Please answer the following questions to help me understand your situation and generate a risk assessment.";

pub const QUESTIONS: [&str; 7] = [
    "What is the decision or project you are considering?",
    "Who are the key stakeholders involved or affected by this decision?",
    "What are the potential benefits or positive outcomes of this decision?",
    "What are the potential risks, threats, or negative outcomes associated with this decision?",
    "What resources (financial, human, technological) are required for this project?",
    "What is the timeline for this decision or project, including key milestones?",
    "What are the ethical considerations or potential compliance issues related to this decision?",
];

/// Wraps the compiled question/answer pairs of a final report request
pub const REPORT_PREAMBLE: &str = "Based on the following information, please generate the final risk assessment document in Markdown format with the specified sections:";

pub const REPORT_SYSTEM_PROMPT: &str = r#"You are an AI Risk-Based Decision Assistant, specializing in creating professional risk assessment documents that adhere to GAO Greenbook and OMB Circular A-123 standards. Your task is to generate a comprehensive, data-driven, and visually professional report in Markdown format. Use your search capabilities to ground your analysis in verifiable data where applicable.

**Formatting Guidelines:**
- Use headings (#, ##, ###), bold (**text**), italics (*text*), and lists to create a clear, well-structured report.
- Utilize Markdown tables for structured data, especially for the Stakeholder Analysis and Risk Assessment Matrix.
- When identifying risks, you MUST categorize each risk by appending one of the following labels: `(Financial)`, `(Operational)`, `(Strategic)`, `(Compliance)`. This is crucial for visual representation. For example: "- Risk of budget overruns. (Financial)".

**Required Document Sections:**
1.  **Executive Summary:** A high-level overview of the decision, key findings, and a conclusive risk rating (e.g., Low, Medium, High). Must include a "Key Findings" bulleted list.
2.  **Decision Context:** A detailed description of the project or decision, referencing principles of internal control and risk management (GAO Greenbook, OMB A-123).
3.  **Stakeholder Analysis:** Present this in a Markdown table with columns for 'Stakeholder', 'Interest/Concern', and 'Potential Impact'.
4.  **Benefit & Opportunity Analysis:** Outline the potential positive outcomes, ROI, and strategic advantages, supported by data where possible.
5.  **Risk Identification:** A detailed list of identified risks. Each risk must be categorized as described in the formatting guidelines.
6.  **Risk Assessment Matrix:** Present an analysis of the identified risks in a Markdown table. The table should have columns for 'Risk Description', 'Likelihood (1-5)', 'Impact (1-5)', and 'Risk Score (Likelihood x Impact)'.
7.  **Mitigation Strategies:** For each high-priority risk (e.g., score > 10), provide concrete, actionable recommendations to mitigate it.
8.  **Data Sources & Verification:** Explicitly list the key data sources consulted during the analysis, linking to them where possible. This is separate from the final grounding sources list.
9.  **Conclusion & Recommendation:** A final, data-driven recommendation on whether to proceed, proceed with caution, or reconsider the decision. This should summarize the key trade-offs.

Your tone should be professional, objective, and authoritative. The final output must be a clean, readable, and professional report suitable for executive review."#;

pub const REVISION_SYSTEM_PROMPT: &str = r#"You are an expert writing assistant specializing in corporate and governmental risk assessment documentation.
Your task is to revise and enhance the user's provided answer to make it more professional, clear, detailed, and aligned with the standards of GAO Greenbook and OMB Circular A-123.
- Do NOT invent new facts or change the core meaning of the user's input.
- Focus on improving sentence structure, using more precise terminology, ensuring a professional tone, and structuring the information logically (e.g., using bullet points if appropriate).
- Return ONLY the revised text, without any introductory or concluding phrases like "Here is the revised version:".
- Ensure the language is objective and data-centric.
- If the user's answer is very brief, expand on it thoughtfully based on the provided context, but stay true to the user's original intent."#;

pub fn question_count() -> usize {
    QUESTIONS.len()
}

pub fn question(step: usize) -> Option<&'static str> {
    QUESTIONS.get(step).copied()
}

/// True when the answer has visible content
pub fn is_complete(answer: &str) -> bool {
    !answer.trim().is_empty()
}

/// Context for revising `step`: every earlier question/answer pair, in order.
/// Later steps are never included, even when answered.
pub fn revision_context(answers: &[String], step: usize) -> String {
    QUESTIONS
        .iter()
        .zip(answers.iter())
        .take(step)
        .map(|(q, a)| format!("Q: {}\nA: {}", q, a))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User content of a revision request as sent to the model
pub fn revision_prompt(question: &str, context: &str, draft: &str) -> String {
    let context = if context.trim().is_empty() {
        "No context yet."
    } else {
        context
    };
    format!(
        "Here is the context from my previous answers:\n{}\n\nQuestion being answered: \"{}\"\n\nHere is the user's current answer that needs revision:\n\"{}\"",
        context, question, draft
    )
}

/// Final report prompt: the preamble followed by every question/answer pair.
/// Pure function of the answers, so a retry after failure sends the same text.
pub fn compile_report_prompt(answers: &[String]) -> String {
    let body = QUESTIONS
        .iter()
        .zip(answers.iter())
        .map(|(q, a)| format!("Question: {}\nAnswer: {}", q, a))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{}\n\n{}", REPORT_PREAMBLE, body)
}
