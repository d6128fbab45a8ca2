//! Pattern helpers for prompt detection.

use regex::bytes::Regex;

/// Compile a prompt pattern string into a regex.
///
/// Anchors to the end of the buffer (allowing trailing whitespace) when the
/// pattern carries no anchor of its own.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    Regex::new(&pattern)
}

/// Build a prompt pattern pinned to one hostname.
///
/// Matches the exec, privileged and configuration prompts of that host
/// only, so output lines that merely end in `#` or `>` do not end a read.
pub fn hostname_prompt_pattern(hostname: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?m)^{}(?:\(config[A-Za-z0-9_.\-@/:+]{{0,32}}\))?[>#]\s?$",
        regex::escape(hostname)
    ))
}

/// Strip the trailing privilege marker from a prompt to get the hostname.
///
/// `switch01#` and `switch01>` both yield `switch01`; configuration
/// prompts such as `switch01(config-if)#` also yield `switch01`.
pub fn hostname_from_prompt(prompt: &str) -> String {
    let prompt = prompt.trim();
    let prompt = prompt
        .strip_suffix('#')
        .or_else(|| prompt.strip_suffix('>'))
        .unwrap_or(prompt);
    match prompt.find("(config") {
        Some(idx) => prompt[..idx].to_string(),
        None => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_prompt_pattern() {
        let pattern = compile_prompt_pattern(r"switch#").unwrap();
        assert!(pattern.is_match(b"switch# "));
        assert!(!pattern.is_match(b"switch#\nmore"));

        let pattern = compile_prompt_pattern(r"switch#$").unwrap();
        assert!(pattern.is_match(b"switch#"));
    }

    #[test]
    fn test_hostname_prompt_pattern() {
        let pattern = hostname_prompt_pattern("sw1.lab").unwrap();
        assert!(pattern.is_match(b"output\r\nsw1.lab#"));
        assert!(pattern.is_match(b"sw1.lab>"));
        assert!(pattern.is_match(b"sw1.lab(config-if)#"));
        assert!(!pattern.is_match(b" description uplink->core>"));
        assert!(!pattern.is_match(b"sw2.lab#"));
    }

    #[test]
    fn test_hostname_from_prompt() {
        assert_eq!(hostname_from_prompt("switch01#"), "switch01");
        assert_eq!(hostname_from_prompt("switch01>"), "switch01");
        assert_eq!(hostname_from_prompt("  idf-2.example.net# "), "idf-2.example.net");
        assert_eq!(hostname_from_prompt("switch01(config-if)#"), "switch01");
        assert_eq!(hostname_from_prompt("switch01"), "switch01");
    }
}
