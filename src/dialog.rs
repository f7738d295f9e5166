//! Localized dialog lookup
//!
//! Dialogs live in `<dir>/<lang>/<name>.dialog`, one variant per line. A
//! random variant is picked on each render so repeated prompts sound less
//! robotic. `{{var}}` placeholders are filled from the supplied context.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;

/// Renders dialogs for one language
#[derive(Debug, Clone)]
pub struct DialogRenderer {
    dir: Option<PathBuf>,
    lang: String,
}

impl DialogRenderer {
    /// Create a renderer; with no `dir` every lookup uses its fallback
    #[must_use]
    pub fn new(dir: Option<PathBuf>, lang: &str) -> Self {
        Self {
            dir,
            lang: lang.to_lowercase(),
        }
    }

    /// Render `name`, or `fallback` when the dialog file is missing or empty
    #[must_use]
    pub fn render(&self, name: &str, fallback: &str, context: &HashMap<&str, String>) -> String {
        let template = self
            .variants(name)
            .and_then(|variants| variants.choose(&mut rand::thread_rng()).cloned())
            .unwrap_or_else(|| fallback.to_string());

        substitute(&template, context)
    }

    /// Render `name` with no placeholders
    #[must_use]
    pub fn get(&self, name: &str, fallback: &str) -> String {
        self.render(name, fallback, &HashMap::new())
    }

    fn variants(&self, name: &str) -> Option<Vec<String>> {
        let path = self.dialog_path(name)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "dialog not found, using fallback"
                );
                return None;
            }
        };

        let variants: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ToString::to_string)
            .collect();

        (!variants.is_empty()).then_some(variants)
    }

    fn dialog_path(&self, name: &str) -> Option<PathBuf> {
        self.dir
            .as_deref()
            .map(|dir| dialog_file(dir, &self.lang, name))
    }
}

fn dialog_file(dir: &Path, lang: &str, name: &str) -> PathBuf {
    dir.join(lang).join(format!("{name}.dialog"))
}

/// Replace `{{key}}` placeholders; unknown keys are left as-is
fn substitute(template: &str, context: &HashMap<&str, String>) -> String {
    context.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{{{key}}}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_without_directory() {
        let dialogs = DialogRenderer::new(None, "en-us");
        assert_eq!(dialogs.get("mycroft.intro", "hello"), "hello");
    }

    #[test]
    fn reads_variants_and_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let lang_dir = dir.path().join("en-us");
        std::fs::create_dir_all(&lang_dir).unwrap();
        std::fs::write(
            lang_dir.join("mycroft.intro.dialog"),
            "# comment\n\nHi there, let's get connected.\n",
        )
        .unwrap();

        let dialogs = DialogRenderer::new(Some(dir.path().to_path_buf()), "EN-US");
        assert_eq!(
            dialogs.get("mycroft.intro", "fallback"),
            "Hi there, let's get connected."
        );
    }

    #[test]
    fn picks_one_of_the_variants() {
        let dir = tempfile::tempdir().unwrap();
        let lang_dir = dir.path().join("en-us");
        std::fs::create_dir_all(&lang_dir).unwrap();
        std::fs::write(lang_dir.join("greet.dialog"), "one\ntwo\n").unwrap();

        let dialogs = DialogRenderer::new(Some(dir.path().to_path_buf()), "en-us");
        let rendered = dialogs.get("greet", "fallback");
        assert!(rendered == "one" || rendered == "two");
    }

    #[test]
    fn fills_placeholders() {
        let mut context = HashMap::new();
        context.insert("name", "Orin".to_string());

        let dialogs = DialogRenderer::new(None, "en-us");
        assert_eq!(
            dialogs.render("missing", "Hello, I am {{name}}. {{other}}", &context),
            "Hello, I am Orin. {{other}}"
        );
    }
}
