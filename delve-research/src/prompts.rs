//! Prompts for the research pipeline and the dual-model merge
//!
//! Each step has a `create_*_prompt` builder; the fixed guidance lives in the
//! constants so tests and callers can refer to it.

use chrono::Local;

/// Human-readable date injected into every research prompt
pub fn current_date() -> String {
    Local::now().format("%B %d, %Y").to_string()
}

/// Guidance for turning a topic into web search queries
pub const QUERY_WRITER_INSTRUCTIONS: &str = r#"
Instructions:
- Always prefer a single search query. Only add another query if the original question asks for multiple aspects or elements and one query is not enough.
- Each query should focus on one specific aspect of the original question.
- Don't produce more than {count} queries.
- Queries should be diverse. If the topic is broad, generate more than one query.
- Don't generate multiple similar queries; one is enough.
- Queries should make sure that the most current information is gathered.
"#;

/// JSON shape expected back from the query writer
pub const QUERY_WRITER_FORMAT: &str =
    r#"{"rationale": "Brief explanation of why these queries are relevant", "query": ["first search query", "second search query"]}"#;

/// Build the query generation prompt
pub fn create_query_writer_prompt(topic: &str, count: usize, date: &str) -> String {
    format!(
        r#"Your goal is to generate sophisticated and diverse web search queries. These queries are intended for an advanced automated web research tool capable of analyzing complex results, following links, and synthesizing information.
{}
The current date is {}.

Format:
- Format your response as a JSON object with exactly these two keys:
   - "rationale": Brief explanation of why these queries are relevant
   - "query": A list of search queries

Context: {}"#,
        QUERY_WRITER_INSTRUCTIONS.replace("{count}", &count.to_string()),
        date,
        topic
    )
}

/// Build the grounded search prompt for one query
pub fn create_web_searcher_prompt(query: &str, date: &str) -> String {
    format!(
        r#"Conduct targeted Google Searches to gather the most recent, credible information on "{query}" and synthesize it into a verifiable text artifact.

Instructions:
- The query should ensure that the most current information is gathered. The current date is {date}.
- Conduct multiple, diverse searches to gather comprehensive information.
- Consolidate key findings while meticulously tracking the source(s) for each specific piece of information.
- The output should be a well-written summary or report based on your search findings.
- Only include the information found in the search results, don't make up any information.

Research Topic:
{query}
"#
    )
}

/// JSON shape expected back from the reflection step
pub const REFLECTION_FORMAT: &str = r#"{"is_sufficient": true, "knowledge_gap": "What is missing or unclear", "follow_up_queries": ["specific follow-up query"]}"#;

/// Build the reflection prompt over all summaries gathered so far
pub fn create_reflection_prompt(topic: &str, summaries: &[String], date: &str) -> String {
    format!(
        r#"You are an expert research assistant analyzing summaries about "{topic}". The current date is {date}.

Instructions:
- Identify knowledge gaps or areas that need deeper exploration and generate follow-up queries (one or more).
- If the provided summaries are sufficient to answer the user's question, don't generate any follow-up queries.
- If there is a knowledge gap, generate follow-up queries that would help expand understanding.
- Focus on technical details, implementation specifics, or emerging trends that weren't fully covered.

Requirements:
- Ensure each follow-up query is self-contained and includes the context needed for web search.

Output Format:
- Format your response as a JSON object with these exact keys:
   - "is_sufficient": true or false
   - "knowledge_gap": Describe what information is missing or needs clarification, empty if sufficient
   - "follow_up_queries": Write specific questions to address this gap, empty if sufficient

Reflect carefully on the Summaries to identify knowledge gaps and produce follow-up queries.

Summaries:
{summaries}
"#,
        summaries = summaries.join("\n\n---\n\n")
    )
}

/// Build the final answer prompt
pub fn create_answer_prompt(topic: &str, summaries: &[String], date: &str) -> String {
    format!(
        r#"Generate a high-quality answer to the user's question based on the provided summaries.

Instructions:
- The current date is {date}.
- You are the final step of a multi-step research process; don't mention that you are the final step.
- You have access to all the information gathered from the previous steps.
- You have access to the user's question.
- Generate a high-quality answer to the user's question based on the provided summaries and the user's question.
- You MUST include all the citations from the summaries in the answer correctly, keeping the markdown links exactly as written.

User Context:
- {topic}

Summaries:
{summaries}
"#,
        summaries = summaries.join("\n---\n\n")
    )
}

/// Build the prompt that merges two model answers into one
pub fn create_integration_prompt(question: &str, gemini: &str, siliconflow: &str) -> String {
    format!(
        r#"You are an expert at synthesizing answers. Two AI models answered the same question. Combine their answers into a single, better response.

Original question: {question}

Answer from Gemini:
{gemini}

Answer from SiliconFlow:
{siliconflow}

Requirements:
1. Keep the strengths and accurate information of both answers.
2. If the answers conflict, point out the differences and give the most reasonable view.
3. If one answer covers something the other misses, fill in the gap.
4. Organize the result with a clear structure that is easy to follow.

Provide the integrated answer:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_writer_prompt_has_count_and_topic() {
        let prompt = create_query_writer_prompt("rust async runtimes", 3, "January 01, 2025");
        assert!(prompt.contains("Don't produce more than 3 queries"));
        assert!(prompt.contains("Context: rust async runtimes"));
        assert!(prompt.contains("January 01, 2025"));
        assert!(!prompt.contains("{count}"));
    }

    #[test]
    fn test_summary_separators() {
        let summaries = vec!["one".to_string(), "two".to_string()];
        let reflection = create_reflection_prompt("t", &summaries, "d");
        assert!(reflection.contains("one\n\n---\n\ntwo"));

        let answer = create_answer_prompt("t", &summaries, "d");
        assert!(answer.contains("one\n---\n\ntwo"));
    }

    #[test]
    fn test_integration_prompt_includes_both_answers() {
        let prompt = create_integration_prompt("Q?", "from gemini", "from qwen");
        assert!(prompt.contains("Original question: Q?"));
        assert!(prompt.contains("from gemini"));
        assert!(prompt.contains("from qwen"));
    }

    #[test]
    fn test_current_date_format() {
        let date = current_date();
        assert!(date.contains(", "));
        assert!(date.split(' ').count() == 3);
    }
}
