//! Suggested analysis prompt printed by `--show-prompt`

const RULE_WIDTH: usize = 80;

pub const PROMPT_HEADING: &str =
    "SUGGESTED LLM QUERY (copy and paste this into your LLM interface after the context):";

pub const SUGGESTED_PROMPT: &str = r#"Hello AI, I've provided the context for a software project above.
I am generally satisfied with the current state of this project, but I am seeking an expert "second opinion" to identify areas for further refinement, risk mitigation, and strategic improvement. Please assume the role of a seasoned principal engineer or software architect reviewing this codebase.

**Important: provide all feedback as descriptive text. Do not generate code diffs or direct code examples for any proposed change.**

Focus your analysis on the following, even if the project appears to be functioning well:

1.  **Proactive Risk Identification:**
    *   **Security:** subtle vulnerabilities in dependencies, data handling, input validation, configuration or authorization.
    *   **Scalability & Performance:** non-obvious bottlenecks and areas that will not hold up under more load, data or concurrency.
    *   **Resilience & Reliability:** behavior under partial failure, and where fault tolerance or graceful degradation could improve.

2.  **Code & Design Refinement:**
    *   **Simplification:** sections that could be simpler, clearer or easier to maintain.
    *   **Idiomatic Use:** language features, patterns or standard library utilities that would improve readability or type safety.

3.  **Ecosystem Leverage & Future-Proofing:**
    *   **Libraries & Tools:** dependencies with better-maintained alternatives, and custom logic a well-established library could replace.
    *   **Testability:** the logic that would benefit most from stronger tests, including property-based or integration tests.
    *   **Observability & Operability:** logging, metrics and tracing improvements, and anything that would ease deployment.
    *   **Architecture:** patterns relevant to the project's future evolution, without over-engineering.

4.  **General Areas for Enhancement:**
    *   Any other blind spots: documentation, developer experience, or domain-specific best practices.

**Output Structure:**
Use a heading per major point. For each item, explain the issue or opportunity and suggest a high-level approach. When referring to the codebase, name the location (file, function or line range) and describe the change conceptually. Prioritize actionable insights.

**Guiding Questions:**
Conclude by posing 3 to 5 questions that help me clarify strategic goals, uncover hidden constraints and trade-offs, explore future evolution, challenge assumptions, and prioritize next steps.

Let's explore how to elevate this project further!"#;

/// Prompt framed by horizontal rules, ready for stderr
pub fn prompt_banner() -> String {
    let rule = "-".repeat(RULE_WIDTH);
    format!(
        "\n{rule}\n{PROMPT_HEADING}\n{rule}\n\n{SUGGESTED_PROMPT}\n\n{rule}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_frames_prompt() {
        let banner = prompt_banner();
        let rule = "-".repeat(RULE_WIDTH);
        assert!(banner.starts_with(&format!("\n{}\n{}\n", rule, PROMPT_HEADING)));
        assert!(banner.ends_with(&format!("{}\n", rule)));
        assert!(banner.contains("second opinion"));
    }
}
