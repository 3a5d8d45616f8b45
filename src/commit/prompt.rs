//! Prompt construction for AI-generated commit messages.

/// Commit types the model may choose from.
pub const COMMIT_TYPES: [&str; 11] = [
    "feat", "fix", "docs", "style", "refactor", "perf", "test", "build", "ci", "chore", "revert",
];

/// Maximum subject line length requested from the model.
pub const MAX_SUBJECT_LENGTH: usize = 50;

/// Build the prompt for generating a commit message.
///
/// The diff is embedded as-is inside a fenced block. The reply is expected to
/// be the finished commit message with no surrounding prose.
pub fn build_commit_prompt(diff: &str) -> String {
    let types = COMMIT_TYPES.join(", ");

    format!(
        r#"You are an expert software engineer writing a Git commit message for the staged changes below.

## Format
```
<type>(<scope>): <subject>

<body>
```

## Subject Line Rules
- Type: one of {types}
- Scope: optional, the module or area affected (e.g., `auth`, `parser`)
- Subject: imperative, present tense ("add", not "added" or "adds")
- No capital letter after the colon, no period at the end
- The whole subject line MUST be at most {max} characters

## Body Rules
- Optional; leave it out for trivial changes
- Explain why the change was made and how, not what the diff already shows
- Write it as a bulleted list, one point per line starting with "- "

## Style
- No emojis or decorative symbols
- Professional, neutral tone
- Respond with ONLY the commit message, no explanation and no markdown fences

## Staged Diff
```diff
{diff}
```"#,
        max = MAX_SUBJECT_LENGTH,
    )
}
