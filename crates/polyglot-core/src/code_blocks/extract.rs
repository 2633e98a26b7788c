//! Tag resolution, extraction and editor routing.

use super::{CodeBlockResponse, CodeSlot, FenceScanner};
use tracing::trace;

/// Resolves a fence tag to a fixed slot.
///
/// Matching is case-insensitive and ignores surrounding whitespace. Unknown
/// and empty tags resolve to nothing.
pub fn resolve_tag(tag: &str) -> Option<CodeSlot> {
    match tag.trim().to_lowercase().as_str() {
        "pseudo" | "pseudocode" | "text" | "plaintext" => Some(CodeSlot::PseudoCode),
        "python" | "py" => Some(CodeSlot::Python),
        "java" => Some(CodeSlot::Java),
        "cpp" | "c++" | "c" => Some(CodeSlot::Cpp),
        "javascript" | "js" => Some(CodeSlot::JavaScript),
        _ => None,
    }
}

/// Splits a response into per-language blocks.
///
/// An untagged first block is taken as pseudocode. Each slot keeps the first
/// block resolving to it; unresolved blocks are dropped.
pub fn extract(text: &str) -> CodeBlockResponse {
    extract_with(text, None)
}

/// Like [`extract`], but a block tagged with `editor_language` that has no
/// fixed slot is kept in the `editor` slot.
pub fn extract_for_editor(text: &str, editor_language: &str) -> CodeBlockResponse {
    let editor_language = editor_language.trim().to_lowercase();
    if editor_language.is_empty() {
        return extract_with(text, None);
    }
    extract_with(text, Some(&editor_language))
}

fn extract_with(text: &str, editor_language: Option<&str>) -> CodeBlockResponse {
    let mut response = CodeBlockResponse::default();

    for segment in FenceScanner::new(text) {
        let tag = segment.tag.to_lowercase();
        let slot = match resolve_tag(&tag) {
            Some(slot) => Some(slot),
            None if tag.is_empty() && segment.index == 0 && response.pseudo_code.is_empty() => {
                Some(CodeSlot::PseudoCode)
            }
            None if editor_language == Some(tag.as_str()) => Some(CodeSlot::Editor),
            None => None,
        };

        match slot {
            Some(slot) => {
                if !response.fill(slot, segment.body) {
                    trace!(slot = %slot, index = segment.index, "Slot already filled, block dropped");
                }
            }
            None => trace!(tag = %segment.tag, index = segment.index, "Unresolved block dropped"),
        }
    }

    response
}

/// Picks the block that should replace the editor buffer.
///
/// The `editor` slot wins; otherwise the slot the editor language resolves
/// to. Returns `None` when neither holds code.
pub fn route_to_editor<'a>(response: &'a CodeBlockResponse, editor_language: &str) -> Option<&'a str> {
    if !response.editor.is_empty() {
        return Some(&response.editor);
    }
    resolve_tag(editor_language).map(|slot| response.get(slot)).filter(|code| !code.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_tag_table() {
        for tag in ["pseudo", "pseudocode", "text", "plaintext", "PseudoCode"] {
            assert_eq!(resolve_tag(tag), Some(CodeSlot::PseudoCode), "{tag}");
        }
        assert_eq!(resolve_tag("py"), Some(CodeSlot::Python));
        assert_eq!(resolve_tag(" Python "), Some(CodeSlot::Python));
        assert_eq!(resolve_tag("JAVA"), Some(CodeSlot::Java));
        for tag in ["cpp", "c++", "c", "C"] {
            assert_eq!(resolve_tag(tag), Some(CodeSlot::Cpp), "{tag}");
        }
        assert_eq!(resolve_tag("js"), Some(CodeSlot::JavaScript));
        assert_eq!(resolve_tag("javascript"), Some(CodeSlot::JavaScript));
        assert_eq!(resolve_tag("rust"), None);
        assert_eq!(resolve_tag(""), None);
    }

    #[test]
    fn test_no_fences_all_empty() {
        let response = extract("Just an explanation, no code at all.");
        assert_eq!(response, CodeBlockResponse::default());
        assert!(response.is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_single_python_block() {
        let response = extract("Answer:\n```python\n  def f():\n    return 1\n```\n");
        assert_eq!(response.python, "def f():\n    return 1");
        assert_eq!(response.filled_slots(), vec![CodeSlot::Python]);
    }

    #[test]
    fn test_untagged_first_block_is_pseudocode() {
        let response = extract("```\nfoo()\n```");
        assert_eq!(response.pseudo_code, "foo()");
        assert_eq!(response.filled_slots(), vec![CodeSlot::PseudoCode]);
    }

    #[test]
    fn test_untagged_later_block_is_dropped() {
        let response = extract("```python\nx = 1\n```\n```\nmystery\n```");
        assert_eq!(response.python, "x = 1");
        assert!(response.pseudo_code.is_empty());
    }

    #[test]
    fn test_first_java_block_wins() {
        let response = extract("```java\nclass First {}\n```\ntext\n```java\nclass Second {}\n```");
        assert_eq!(response.java, "class First {}");
    }

    #[test]
    fn test_cpp_aliases() {
        assert_eq!(extract("```c++\nint a;\n```").cpp, "int a;");
        assert_eq!(extract("```c\nint b;\n```").cpp, "int b;");
    }

    #[test]
    fn test_unknown_tags_dropped() {
        let response = extract("```rust\nfn main() {}\n```\n```go\npackage main\n```");
        assert!(response.is_empty());
    }

    #[test]
    fn test_plan_scenario() {
        let response = extract("Here is the plan:\n```pseudo\nSTEP 1\n```\n```python\nprint(1)\n```");
        assert_eq!(
            response,
            CodeBlockResponse {
                pseudo_code: "STEP 1".to_string(),
                python: "print(1)".to_string(),
                ..CodeBlockResponse::default()
            }
        );
    }

    #[test]
    fn test_full_generation_response() {
        let text = "\
Pseudocode:
```pseudocode
READ n
PRINT n * 2
```
Python:
```python
n = int(input())
print(n * 2)
```
Java:
```java
public class Main {}
```
C++:
```cpp
int main() { return 0; }
```
JavaScript:
```javascript
console.log(2);
```
Time complexity: O(1)";
        let response = extract(text);
        assert_eq!(response.filled_slots(), CodeSlot::FIXED.to_vec());
        assert_eq!(response.pseudo_code, "READ n\nPRINT n * 2");
        assert_eq!(response.javascript, "console.log(2);");
    }

    #[test]
    fn test_extracted_body_has_nothing_to_extract() {
        let response = extract("```python\nprint('hi')\n```");
        assert!(extract(&response.python).is_empty());
    }

    #[test]
    fn test_editor_slot_for_unmapped_language() {
        let text = "```typescript\nconst x: number = 1;\n```\n```python\nx = 1\n```";
        let response = extract_for_editor(text, "TypeScript");
        assert_eq!(response.editor, "const x: number = 1;");
        assert_eq!(response.python, "x = 1");

        // Without the editor variant the block is dropped.
        assert!(extract(text).editor.is_empty());
    }

    #[test]
    fn test_editor_slot_ignores_mapped_languages() {
        let response = extract_for_editor("```python\nx = 1\n```", "python");
        assert!(response.editor.is_empty());
        assert_eq!(response.python, "x = 1");
    }

    #[test]
    fn test_empty_editor_language_never_fills_editor() {
        let response = extract_for_editor("```python\na\n```\n```\nb\n```", "  ");
        assert!(response.editor.is_empty());
    }

    #[test]
    fn test_route_prefers_editor_slot() {
        let response = CodeBlockResponse {
            editor: "editor code".to_string(),
            java: "java code".to_string(),
            ..CodeBlockResponse::default()
        };
        assert_eq!(route_to_editor(&response, "java"), Some("editor code"));
    }

    #[test]
    fn test_route_falls_back_to_table_slot() {
        let response = extract("```js\nalert(1)\n```");
        assert_eq!(route_to_editor(&response, "javascript"), Some("alert(1)"));
        assert_eq!(route_to_editor(&response, "python"), None);
        assert_eq!(route_to_editor(&response, "kotlin"), None);
    }
}
