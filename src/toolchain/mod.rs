//! Cross/native toolchain descriptor parsing: an INI-like
//! format with fixed section names, used identically for
//! `--cross-file` and `--native-file` — the only difference is which
//! machine the caller treats the result as describing.
//!
//! Grounded on the hand-written scanning style already used for the
//! DSL lexer (`legacy_src/parser/lexer.rs`'s char-by-char loop with explicit
//! quote/escape handling) generalized from tokenizing DSL source to
//! tokenizing `key = value` lines; value typing (string/int/bool/list)
//! follows the primitive set `toml::Value` distinguishes.

pub mod types;

pub use types::{ToolchainError, ToolchainFile, ToolchainValue};

use indexmap::IndexMap;
use std::path::Path;

/// Load and merge a chain of descriptor files in argument order; later
/// files win for overlapping keys within the same section. The same
/// merge is reused for combining `--native-file` with `--cross-file`.
pub fn load_chain(paths: &[impl AsRef<Path>]) -> Result<ToolchainFile, ToolchainError> {
    let mut merged = ToolchainFile::default();
    for path in paths {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ToolchainError::Io(path.display().to_string(), e.to_string()))?;
        merged.merge(parse_str(&text, &path.display().to_string())?);
    }
    Ok(merged)
}

pub fn parse_str(text: &str, source_name: &str) -> Result<ToolchainFile, ToolchainError> {
    let mut file = ToolchainFile::default();
    let mut section: Option<&'static str> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            section = Some(match name {
                "binaries" => "binaries",
                "host_machine" => "host_machine",
                "target_machine" => "target_machine",
                "build_machine" => "build_machine",
                "properties" => "properties",
                "built-in options" => "built-in options",
                "project options" => "project options",
                other => {
                    return Err(ToolchainError::Syntax(
                        source_name.to_string(),
                        lineno,
                        format!("unknown section '[{other}]'"),
                    ))
                }
            });
            continue;
        }

        let Some((key, raw_value)) = line.split_once('=') else {
            return Err(ToolchainError::Syntax(
                source_name.to_string(),
                lineno,
                format!("expected 'key = value', got '{line}'"),
            ));
        };
        let Some(active) = section else {
            return Err(ToolchainError::Syntax(
                source_name.to_string(),
                lineno,
                "key assignment before any [section] header".to_string(),
            ));
        };
        let value = parse_value(raw_value.trim())
            .map_err(|e| ToolchainError::Syntax(source_name.to_string(), lineno, e))?;
        let target: &mut IndexMap<String, ToolchainValue> = match active {
            "binaries" => &mut file.binaries,
            "host_machine" => &mut file.host_machine,
            "target_machine" => &mut file.target_machine,
            "build_machine" => &mut file.build_machine,
            "properties" => &mut file.properties,
            "built-in options" => &mut file.built_in_options,
            "project options" => &mut file.project_options,
            _ => unreachable!("section names are validated on entry"),
        };
        target.insert(key.trim().to_string(), value);
    }

    Ok(file)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Parse one RHS: quoted string, `true`/`false`, a bare integer, a
/// `['a', 'b']` single-level list, or a bare unquoted word treated as
/// a string (meson's own native/cross files allow unquoted program
/// names under `[binaries]`, e.g. `c = 'gcc'` vs `c = gcc`).
fn parse_value(raw: &str) -> Result<ToolchainValue, String> {
    if let Some(inner) = raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let items = split_list(inner)?
            .into_iter()
            .map(|item| unquote(item.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(ToolchainValue::List(items));
    }
    if raw == "true" {
        return Ok(ToolchainValue::Bool(true));
    }
    if raw == "false" {
        return Ok(ToolchainValue::Bool(false));
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(ToolchainValue::Int(n));
    }
    unquote(raw).map(ToolchainValue::Str)
}

fn split_list(inner: &str) -> Result<Vec<&str>, String> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(inner.split(',').collect())
}

fn unquote(raw: &str) -> Result<String, String> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'\'' || bytes[0] == b'"') && bytes[bytes.len() - 1] == bytes[0] {
        Ok(raw[1..raw.len() - 1].to_string())
    } else if raw.starts_with('\'') || raw.starts_with('"') {
        Err(format!("unterminated quoted value '{raw}'"))
    } else {
        Ok(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_binaries_and_properties() {
        let text = "[binaries]\nc = 'arm-none-eabi-gcc'\nar = 'arm-none-eabi-ar'\n\n[properties]\nneeds_exe_wrapper = true\n";
        let file = parse_str(text, "cross.txt").unwrap();
        assert_eq!(file.binary("c"), Some("arm-none-eabi-gcc"));
        assert_eq!(file.properties.get("needs_exe_wrapper"), Some(&ToolchainValue::Bool(true)));
    }

    #[test]
    fn parses_host_machine_list_and_ints() {
        let text = "[host_machine]\nsystem = 'linux'\ncpu_family = 'arm'\nendian = 'little'\n\n[built-in options]\nc_args = ['-O2', '-g']\noptimization = 2\n";
        let file = parse_str(text, "cross.txt").unwrap();
        assert_eq!(file.host_machine.get("system"), Some(&ToolchainValue::Str("linux".to_string())));
        assert_eq!(
            file.built_in_options.get("c_args"),
            Some(&ToolchainValue::List(vec!["-O2".to_string(), "-g".to_string()]))
        );
        assert_eq!(file.built_in_options.get("optimization"), Some(&ToolchainValue::Int(2)));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# a cross file\n[binaries]\n# the compiler\nc = 'cc' # trailing comment\n";
        let file = parse_str(text, "x.txt").unwrap();
        assert_eq!(file.binary("c"), Some("cc"));
    }

    #[test]
    fn key_before_section_errors() {
        let text = "c = 'cc'\n";
        assert!(parse_str(text, "x.txt").is_err());
    }

    #[test]
    fn unknown_section_errors() {
        let text = "[nope]\nx = 1\n";
        assert!(parse_str(text, "x.txt").is_err());
    }

    #[test]
    fn later_file_wins_on_merge() {
        let mut first = parse_str("[binaries]\nc = 'gcc'\ncxx = 'g++'\n", "a.txt").unwrap();
        let second = parse_str("[binaries]\nc = 'clang'\n", "b.txt").unwrap();
        first.merge(second);
        assert_eq!(first.binary("c"), Some("clang"));
        assert_eq!(first.binary("cxx"), Some("g++"));
    }
}
