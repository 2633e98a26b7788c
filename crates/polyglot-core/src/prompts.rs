//! Prompts sent to the model for each assistant action.
//!
//! Every builder returns the full message list together with the sampling
//! parameters the action uses.

use crate::code_blocks::{CodeBlockResponse, CodeSlot};
use polyglot_abstraction::{ChatMessage, ModelParameters};
use std::fmt::Write as _;

const CODE_ASSISTANT: &str = "You're a helpful code assistant.";
const REVIEWER: &str = "You are a helpful AI code reviewer.";
const GENERATION_SYSTEM: &str = "You're a helpful code assistant. Given a problem statement, \
     return pseudocode and solutions in Python, Java, C++, and JavaScript.";
const CHAT_SYSTEM: &str = "You are a helpful coding assistant. When providing code updates, \
     always include code blocks for all languages (pseudocode, python, java, cpp, javascript).";

const CREATIVE_TEMPERATURE: f32 = 0.3;
const REVIEW_TEMPERATURE: f32 = 0.2;

/// A ready-to-send request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub messages: Vec<ChatMessage>,
    pub parameters: ModelParameters,
}

impl Prompt {
    fn new(messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self { messages, parameters: ModelParameters::with_temperature(temperature) }
    }
}

/// Fences `code`, using one backtick more than the longest run inside it so
/// embedded fences cannot close the block early.
fn fenced(tag: &str, code: &str) -> String {
    let longest_run = code.split(|c| c != '`').map(str::len).max().unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    format!("{fence}{tag}\n{code}\n{fence}")
}

/// Asks for pseudocode plus solutions in the four supported languages.
pub fn generation(problem: &str) -> Prompt {
    let user = format!(
        "Problem: {}\nPlease provide the following:\n1. Pseudocode\n2. Python\n3. Java\n4. C++\n5. JavaScript",
        problem.trim()
    );
    Prompt::new(
        vec![ChatMessage::system(GENERATION_SYSTEM), ChatMessage::user(user)],
        CREATIVE_TEMPERATURE,
    )
}

/// The user turn of a chat exchange: editor buffer, current solutions and the
/// question.
pub fn chat_context(
    editor_code: &str,
    editor_language: &str,
    generated: &CodeBlockResponse,
    query: &str,
) -> String {
    let mut context = format!(
        "Current Editor Code ({lang}):\n{code}\n\nGenerated Code Solutions:\n",
        lang = editor_language,
        code = fenced(editor_language, editor_code),
    );

    for slot in CodeSlot::FIXED {
        let code = generated.get(slot);
        if code.is_empty() {
            continue;
        }
        let _ = writeln!(context, "{}:\n{}", slot_heading(slot), fenced(slot.fence_tag(), code));
    }

    let _ = write!(
        context,
        "\nUser Query: {}\n\nPlease help the user with their query. If you're providing code \
         improvements or fixes, return the updated code in code blocks for each language. Always \
         include all languages (pseudocode, python, java, cpp, javascript) even if only one needs \
         updating.",
        query.trim()
    );
    context
}

fn slot_heading(slot: CodeSlot) -> &'static str {
    match slot {
        CodeSlot::PseudoCode => "Pseudocode",
        CodeSlot::Python => "Python",
        CodeSlot::Java => "Java",
        CodeSlot::Cpp => "C++",
        CodeSlot::JavaScript => "JavaScript",
        CodeSlot::Editor => "Editor",
    }
}

/// System prompt, prior turns, then the context for `query`.
pub fn chat(history: &[ChatMessage], context: String) -> Prompt {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(CHAT_SYSTEM));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(context));
    Prompt::new(messages, CREATIVE_TEMPERATURE)
}

/// Asks for one review finding per line.
pub fn analysis(code: &str, language: &str) -> Prompt {
    let user = format!(
        "You are a code reviewer. Please review the following {lang} code and identify errors, \
         warnings, or suggestions with line numbers if possible.\n\n{code}\nReturn each issue on a new line.",
        lang = language,
        code = fenced(language, code),
    );
    Prompt::new(vec![ChatMessage::system(REVIEWER), ChatMessage::user(user)], REVIEW_TEMPERATURE)
}

/// Asks for a sectioned review: issues, techniques, complexity, improvements.
pub fn debug_review(code: &str, language: &str) -> Prompt {
    let user = format!(
        "You are a code reviewer. Please review the following {lang} code and provide the following:\n\n\
         1. Identify any errors or warnings with line numbers if possible.\n\
         2. Explain what algorithms or techniques are being used.\n\
         3. Provide the time complexity of the code.\n\
         4. Provide the space complexity of the code.\n\
         5. Suggest any possible optimizations or improvements.\n\
         Here is the code:\n\n{code}\n\n\
         Please format the response clearly with headings for each section.",
        lang = language,
        code = fenced(language, code),
    );
    Prompt::new(
        vec![ChatMessage::system(CODE_ASSISTANT), ChatMessage::user(user)],
        REVIEW_TEMPERATURE,
    )
}

/// Asks for `code` rewritten from `from` into `to`, in a single block.
pub fn conversion(code: &str, from: &str, to: &str) -> Prompt {
    let user = format!(
        "{assistant}\nConvert the following code from {from} to {to}:\n\n{code}\n\n\
         Please return only the converted code inside a single code block in {to}.",
        assistant = CODE_ASSISTANT,
        code = fenced(from, code),
    );
    Prompt::new(
        vec![ChatMessage::system(CODE_ASSISTANT), ChatMessage::user(user)],
        CREATIVE_TEMPERATURE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_prompt() {
        let prompt = generation("  Reverse a string ");
        assert_eq!(prompt.messages.len(), 2);
        assert_eq!(prompt.messages[0].role, "system");
        assert!(prompt.messages[1].content.starts_with("Problem: Reverse a string\n"));
        assert!(prompt.messages[1].content.ends_with("5. JavaScript"));
        assert_eq!(prompt.parameters.temperature, Some(0.3));
    }

    #[test]
    fn test_chat_context_includes_only_filled_solutions() {
        let generated = CodeBlockResponse {
            pseudo_code: "STEP".to_string(),
            cpp: "int main() {}".to_string(),
            ..CodeBlockResponse::default()
        };
        let context = chat_context("print(1)", "python", &generated, "why?");

        assert!(context.starts_with("Current Editor Code (python):\n```python\nprint(1)\n```"));
        assert!(context.contains("Pseudocode:\n```pseudo\nSTEP\n```\n"));
        assert!(context.contains("C++:\n```cpp\nint main() {}\n```\n"));
        assert!(!context.contains("```java"));
        assert!(context.contains("User Query: why?"));
        assert!(context.contains("Always include all languages"));
    }

    #[test]
    fn test_chat_context_round_trips_through_extractor() {
        let generated = CodeBlockResponse {
            pseudo_code: "STEP".to_string(),
            java: "class A {}".to_string(),
            ..CodeBlockResponse::default()
        };
        let context = chat_context("let x = 1;", "javascript", &generated, "q");
        let extracted = crate::code_blocks::extract(&context);

        assert_eq!(extracted.javascript, "let x = 1;");
        assert_eq!(extracted.pseudo_code, "STEP");
        assert_eq!(extracted.java, "class A {}");
    }

    #[test]
    fn test_chat_prompt_order() {
        let history = vec![ChatMessage::user("earlier"), ChatMessage::assistant("reply")];
        let prompt = chat(&history, "context".to_string());

        let roles: Vec<&str> = prompt.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(prompt.messages[3].content, "context");
        assert_eq!(prompt.parameters.temperature, Some(0.3));
    }

    #[test]
    fn test_review_prompts_use_low_temperature() {
        let analysis = analysis("x = 1", "python");
        assert_eq!(analysis.parameters.temperature, Some(0.2));
        assert!(analysis.messages[1].content.contains("```python\nx = 1\n```"));
        assert!(analysis.messages[1].content.ends_with("Return each issue on a new line."));

        let debug = debug_review("x = 1", "python");
        assert_eq!(debug.parameters.temperature, Some(0.2));
        assert!(debug.messages[1].content.contains("3. Provide the time complexity"));
    }

    #[test]
    fn test_conversion_prompt() {
        let prompt = conversion("print(1)", "python", "java");
        let user = &prompt.messages[1].content;
        assert!(user.contains("Convert the following code from python to java:"));
        assert!(user.contains("```python\nprint(1)\n```"));
        assert!(user.ends_with("single code block in java."));
        assert_eq!(prompt.parameters.temperature, Some(0.3));
    }

    #[test]
    fn test_fence_outgrows_embedded_backticks() {
        assert_eq!(fenced("python", "print(1)"), "```python\nprint(1)\n```");
        assert_eq!(fenced("js", "const s = `a`;"), "```js\nconst s = `a`;\n```");

        let markdown = "doc = \"\"\"\n```python\nx = 1\n```\n\"\"\"";
        let block = fenced("python", markdown);
        assert!(block.starts_with("````python\n"));
        assert!(block.ends_with("\n````"));

        let prompt = conversion("s = '`````'", "python", "java");
        assert!(prompt.messages[1].content.contains("``````python\ns = '`````'\n``````"));
    }
}
