//! LaTeX Refactorer — applies an `EditPlan` to the source résumé.
//!
//! Application is deterministic: directives run in plan order against
//! progressively mutated text, so every anchored directive re-verifies its
//! `original_text` immediately before applying (an earlier directive may
//! have shifted the text). A failed re-verification marks that directive
//! `failed_at_apply` and mutates nothing. The preamble is structurally
//! untouched — all searches are restricted to after `\begin{document}`.

use regex::Regex;
use tracing::{info, warn};

use crate::errors::StageError;
use crate::models::plan::{DiffSummary, DirectiveOp, EditDirective, EditPlan, TailoredResume};

pub fn run(plan: &EditPlan, resume_latex: &str) -> Result<TailoredResume, StageError> {
    let mut text = resume_latex.to_string();
    let mut applied = 0u32;
    let mut failed_at_apply = 0u32;

    for directive in &plan.directives {
        match apply_directive(&text, directive) {
            Some(next) => {
                text = next;
                applied += 1;
            }
            None => {
                warn!(
                    "Directive failed at apply ({:?} in '{}'): target text not found",
                    directive.operation, directive.target_section
                );
                failed_at_apply += 1;
            }
        }
    }

    info!(
        "Refactor applied {}/{} directives ({} failed at apply)",
        applied,
        plan.directives.len(),
        failed_at_apply
    );

    if applied == 0 {
        // Output identical to input is not a useful result.
        return Err(StageError::Refactor(format!(
            "no directives could be applied ({failed_at_apply} failed)"
        )));
    }

    Ok(TailoredResume {
        latex: text,
        diff_summary: DiffSummary {
            applied,
            skipped_at_validation: plan.skipped_at_validation,
            failed_at_apply,
        },
    })
}

/// Applies one directive, returning the mutated document or `None` when the
/// directive's anchor cannot be located in the current text.
fn apply_directive(text: &str, directive: &EditDirective) -> Option<String> {
    let body = body_start(text);
    match directive.operation {
        DirectiveOp::RewriteBullet => replace_anchored(
            text,
            body,
            directive.original_text.as_deref()?,
            &directive.new_text,
        ),
        DirectiveOp::RemoveBullet => {
            remove_anchored(text, body, directive.original_text.as_deref()?)
        }
        DirectiveOp::AddBullet => {
            add_bullet(text, body, &directive.target_section, &directive.new_text)
        }
        DirectiveOp::InjectKeyword => match directive.original_text.as_deref() {
            // Anchored injection is a rewrite: the strategist rewords an
            // existing phrase around the keyword.
            Some(original) => replace_anchored(text, body, original, &directive.new_text),
            None => inject_keyword(text, body, &directive.target_section, &directive.new_text),
        },
    }
}

/// Byte offset of the document body. Everything before it (the preamble) is
/// off-limits to every search and mutation.
fn body_start(text: &str) -> usize {
    const BEGIN: &str = r"\begin{document}";
    text.find(BEGIN).map(|i| i + BEGIN.len()).unwrap_or(0)
}

fn replace_anchored(text: &str, from: usize, original: &str, new_text: &str) -> Option<String> {
    if original.is_empty() {
        return None;
    }
    let start = from + text[from..].find(original)?;
    let mut out = String::with_capacity(text.len() + new_text.len());
    out.push_str(&text[..start]);
    out.push_str(new_text);
    out.push_str(&text[start + original.len()..]);
    Some(out)
}

/// Removes the first body occurrence of `original`. A line left holding only
/// a bare `\item` (or nothing) is deleted with it.
fn remove_anchored(text: &str, from: usize, original: &str) -> Option<String> {
    if original.is_empty() {
        return None;
    }
    let start = from + text[from..].find(original)?;
    let end = start + original.len();

    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line_end = text[end..]
        .find('\n')
        .map(|i| end + i + 1)
        .unwrap_or(text.len());

    let leftover = format!("{}{}", &text[line_start..start], &text[end..line_end]);
    let leftover = leftover.trim();
    if leftover.is_empty() || leftover == r"\item" {
        Some(format!("{}{}", &text[..line_start], &text[line_end..]))
    } else {
        Some(format!("{}{}", &text[..start], &text[end..]))
    }
}

/// Locates a `\section{…}` (or starred variant) heading whose argument
/// contains `section`, case-insensitively. Returns (start, end) of the match.
fn find_section(text: &str, from: usize, section: &str) -> Option<(usize, usize)> {
    if section.trim().is_empty() {
        return None;
    }
    let pattern = format!(
        r"(?i)\\section\*?\{{[^}}]*{}[^}}]*\}}",
        regex::escape(section.trim())
    );
    let re = Regex::new(&pattern).ok()?;
    let m = re.find(&text[from..])?;
    Some((from + m.start(), from + m.end()))
}

/// Inserts `\item new_text` before the closing `\end{itemize}` of the target
/// section's first itemize environment, matching the block's indentation.
fn add_bullet(text: &str, body: usize, section: &str, new_text: &str) -> Option<String> {
    let (_, heading_end) = find_section(text, body, section)?;

    let next_section = text[heading_end..]
        .find(r"\section")
        .map(|i| heading_end + i)
        .unwrap_or(text.len());
    let begin = heading_end + text[heading_end..next_section].find(r"\begin{itemize}")?;
    let end = begin + text[begin..].find(r"\end{itemize}")?;

    let block = &text[begin..end];
    let indent = block
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with(r"\item"))
        .map(|line| line[..line.len() - line.trim_start().len()].to_string())
        .unwrap_or_else(|| "  ".to_string());

    // Insert at the start of the \end{itemize} line when it sits alone.
    let line_start = text[..end].rfind('\n').map(|i| i + 1).unwrap_or(end);
    let at = if text[line_start..end].trim().is_empty() {
        line_start
    } else {
        end
    };

    let insertion = format!("{indent}\\item {new_text}\n");
    Some(format!("{}{}{}", &text[..at], insertion, &text[at..]))
}

/// Appends the keyword to the first non-empty content line after the target
/// section heading, joined with ", ".
fn inject_keyword(text: &str, body: usize, section: &str, keyword: &str) -> Option<String> {
    let (_, heading_end) = find_section(text, body, section)?;

    let mut cursor = text[heading_end..]
        .find('\n')
        .map(|i| heading_end + i + 1)
        .unwrap_or(text.len());

    while cursor < text.len() {
        let line_end = text[cursor..]
            .find('\n')
            .map(|i| cursor + i)
            .unwrap_or(text.len());
        let line = &text[cursor..line_end];
        if !line.trim().is_empty() {
            let at = cursor + line.trim_end().len();
            return Some(format!("{}, {}{}", &text[..at], keyword, &text[at..]));
        }
        cursor = line_end + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = r"\documentclass{article}
\usepackage{enumitem}
% preamble mentions Python tooling on purpose
\begin{document}
\section{Experience}
\begin{itemize}
  \item Built internal tools using Python
  \item Maintained legacy PHP services
\end{itemize}
\section{Skills}
Python, SQL, Git
\end{document}";

    fn rewrite(original: &str, new_text: &str) -> EditDirective {
        EditDirective {
            target_section: "Experience".to_string(),
            operation: DirectiveOp::RewriteBullet,
            original_text: Some(original.to_string()),
            new_text: new_text.to_string(),
            justification: "test".to_string(),
        }
    }

    fn plan(directives: Vec<EditDirective>) -> EditPlan {
        EditPlan {
            directives,
            skipped_at_validation: 0,
        }
    }

    #[test]
    fn test_rewrite_bullet_replaces_exactly_once() {
        let result = run(
            &plan(vec![rewrite(
                "Built internal tools using Python",
                "Engineered internal developer tools in Python, reducing onboarding time by 30%",
            )]),
            RESUME,
        )
        .unwrap();

        assert!(result
            .latex
            .contains("Engineered internal developer tools in Python, reducing onboarding time by 30%"));
        assert!(!result.latex.contains("Built internal tools using Python"));
        assert_eq!(result.diff_summary.applied, 1);
        assert_eq!(result.diff_summary.failed_at_apply, 0);
    }

    #[test]
    fn test_absent_anchor_fails_that_directive_and_mutates_nothing_else() {
        let result = run(
            &plan(vec![
                rewrite("This text is not present", "replacement"),
                rewrite("Maintained legacy PHP services", "Modernized legacy services"),
            ]),
            RESUME,
        )
        .unwrap();

        assert_eq!(result.diff_summary.failed_at_apply, 1);
        assert_eq!(result.diff_summary.applied, 1);
        // The failed directive changed nothing outside the applied one
        assert!(result.latex.contains("Built internal tools using Python"));
        assert!(result.latex.contains("Modernized legacy services"));
    }

    #[test]
    fn test_remove_bullet_deletes_the_whole_item_line() {
        let directive = EditDirective {
            target_section: "Experience".to_string(),
            operation: DirectiveOp::RemoveBullet,
            original_text: Some("Maintained legacy PHP services".to_string()),
            new_text: String::new(),
            justification: "test".to_string(),
        };
        let result = run(&plan(vec![directive]), RESUME).unwrap();

        assert!(!result.latex.contains("Maintained legacy PHP services"));
        // No orphaned \item left behind
        assert_eq!(result.latex.matches(r"\item").count(), 1);
    }

    #[test]
    fn test_add_bullet_inserts_inside_target_itemize() {
        let directive = EditDirective {
            target_section: "Experience".to_string(),
            operation: DirectiveOp::AddBullet,
            original_text: None,
            new_text: "Deployed services to Kubernetes".to_string(),
            justification: "test".to_string(),
        };
        let result = run(&plan(vec![directive]), RESUME).unwrap();

        let item_pos = result
            .latex
            .find("Deployed services to Kubernetes")
            .unwrap();
        let end_pos = result.latex.find(r"\end{itemize}").unwrap();
        assert!(item_pos < end_pos);
        assert!(result.latex.contains("  \\item Deployed services to Kubernetes"));
    }

    #[test]
    fn test_add_bullet_to_missing_section_fails_at_apply() {
        let directives = vec![
            EditDirective {
                target_section: "Publications".to_string(),
                operation: DirectiveOp::AddBullet,
                original_text: None,
                new_text: "Anything".to_string(),
                justification: "test".to_string(),
            },
            rewrite("Built internal tools using Python", "Shipped tooling"),
        ];
        let result = run(&plan(directives), RESUME).unwrap();
        assert_eq!(result.diff_summary.failed_at_apply, 1);
        assert_eq!(result.diff_summary.applied, 1);
    }

    #[test]
    fn test_inject_keyword_appends_to_skills_line() {
        let directive = EditDirective {
            target_section: "Skills".to_string(),
            operation: DirectiveOp::InjectKeyword,
            original_text: None,
            new_text: "Kubernetes".to_string(),
            justification: "test".to_string(),
        };
        let result = run(&plan(vec![directive]), RESUME).unwrap();
        assert!(result.latex.contains("Python, SQL, Git, Kubernetes"));
    }

    #[test]
    fn test_inject_keyword_with_anchor_rewrites_phrase() {
        let directive = EditDirective {
            target_section: "Skills".to_string(),
            operation: DirectiveOp::InjectKeyword,
            original_text: Some("Python, SQL, Git".to_string()),
            new_text: "Python, SQL, Git, Terraform".to_string(),
            justification: "test".to_string(),
        };
        let result = run(&plan(vec![directive]), RESUME).unwrap();
        assert!(result.latex.contains("Python, SQL, Git, Terraform"));
    }

    #[test]
    fn test_zero_applied_directives_is_refactor_error() {
        let result = run(&plan(vec![rewrite("not present anywhere", "x")]), RESUME);
        match result {
            Err(e) => assert_eq!(e.kind(), "RefactorError"),
            Ok(_) => panic!("expected RefactorError"),
        }
    }

    #[test]
    fn test_preamble_is_never_touched() {
        // "Python tooling" appears in a preamble comment; the only body hit
        // for "Python" is inside the itemize. Anchors resolve in the body.
        let directive = rewrite("Python tooling", "Rust tooling");
        let result = run(
            &plan(vec![
                directive,
                rewrite("Maintained legacy PHP services", "kept"),
            ]),
            RESUME,
        )
        .unwrap();

        // "Python tooling" exists only before \begin{document}; the anchored
        // search must not find it there.
        assert_eq!(result.diff_summary.failed_at_apply, 1);
        assert!(result.latex.contains("% preamble mentions Python tooling on purpose"));
    }

    #[test]
    fn test_reverification_runs_against_mutated_text() {
        // The second directive anchors on text the first directive removed;
        // it must fail at apply rather than corrupt the document.
        let directives = vec![
            rewrite("Built internal tools using Python", "Shipped tooling"),
            rewrite("Built internal tools", "never applies"),
        ];
        let result = run(&plan(directives), RESUME).unwrap();
        assert_eq!(result.diff_summary.applied, 1);
        assert_eq!(result.diff_summary.failed_at_apply, 1);
        assert!(!result.latex.contains("never applies"));
    }

    #[test]
    fn test_skipped_at_validation_carries_into_diff_summary() {
        let mut p = plan(vec![rewrite(
            "Built internal tools using Python",
            "Shipped tooling",
        )]);
        p.skipped_at_validation = 3;
        let result = run(&p, RESUME).unwrap();
        assert_eq!(result.diff_summary.skipped_at_validation, 3);
    }

    #[test]
    fn test_document_without_preamble_still_applies() {
        let bare = "\\section{Experience}\n\\begin{itemize}\n  \\item Did a thing\n\\end{itemize}\n";
        let result = run(&plan(vec![rewrite("Did a thing", "Did a better thing")]), bare).unwrap();
        assert!(result.latex.contains("Did a better thing"));
    }
}
