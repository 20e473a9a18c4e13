//! Composition of injectable script units.
//!
//! Engines that evaluate injected scripts may require the last expression of
//! the unit to be truthy, so every composed unit ends in `true;`. An empty
//! composition yields `None`, which means "inject nothing" rather than an
//! empty but parseable script.

/// Statement appended to every composed unit.
pub const TRUTHY_TERMINATOR: &str = "true;";

/// Join the non-empty chunks with line breaks and terminate the unit.
pub fn compose_scripts<'a, I>(chunks: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let kept: Vec<&str> = chunks
        .into_iter()
        .flatten()
        .filter(|chunk| !chunk.trim().is_empty())
        .collect();

    if kept.is_empty() {
        return None;
    }

    let mut script = kept.join("\n");
    script.push('\n');
    script.push_str(TRUTHY_TERMINATOR);
    Some(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nothing_to_inject_yields_none() {
        assert_eq!(compose_scripts(Vec::<Option<&str>>::new()), None);
        assert_eq!(compose_scripts([None, Some(""), Some("  \n\t")]), None);
    }

    #[test]
    fn chunks_are_joined_in_order_and_terminated() {
        let script = compose_scripts([Some("a();"), None, Some("b();")]).unwrap();
        assert_eq!(script, "a();\nb();\ntrue;");
    }

    #[test]
    fn single_chunk_is_still_terminated() {
        let script = compose_scripts([Some("window.x = 1")]).unwrap();
        assert!(script.starts_with("window.x = 1\n"));
        assert!(script.ends_with(TRUTHY_TERMINATOR));
    }
}
