//! Log redaction for clinical measurements and secrets.
//!
//! Formatted log lines pass through [`SanitizingMakeWriter`] before they
//! reach the sink. It replaces:
//! - Measurement values written as `name=value` or `Label: value`
//! - UUIDs and email addresses
//! - Signing seeds and other `key=...` style secrets
//!
//! Call sites should still avoid logging raw inputs; this is the fallback
//! for whatever slips through.
//!
//! Input is capped (see `GLUCORISK_SANITIZE_MAX_BYTES`) so a runaway log
//! line cannot stall the writer.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::FEATURE_NAMES;

static PATTERNS: OnceLock<RedactionPatterns> = OnceLock::new();

/// Defaults to 16 KiB; override with `GLUCORISK_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct RedactionPattern {
    regex: Regex,
    replacement: &'static str,
}

struct RedactionPatterns {
    set: RegexSet,
    patterns: Vec<RedactionPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("GLUCORISK_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Alternation over every measurement, accepting `blood_pressure`,
/// `blood pressure`, `BloodPressure` and an optional ` level` suffix.
fn measurement_alternation() -> String {
    let names: Vec<String> = FEATURE_NAMES
        .iter()
        .map(|name| name.replace('_', "[_ ]?"))
        .collect();
    format!("(?:{})(?:[_ ]?level)?", names.join("|"))
}

fn get_patterns() -> &'static RedactionPatterns {
    PATTERNS.get_or_init(|| {
        let measurement = format!(
            r"(?i)\b(?P<name>{})\b(?P<sep>\s*[:=]\s*)-?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?",
            measurement_alternation()
        );

        let rules: Vec<(String, &'static str)> = vec![
            (measurement, "${name}${sep}[REDACTED]"),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
                    .to_string(),
                "[REDACTED-UUID]",
            ),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b"
                    .to_string(),
                "[REDACTED-EMAIL]",
            ),
            (
                r"(?i)\b(?:seed|secret|private[_-]?key|signing[_-]?key)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}"
                    .to_string(),
                "[REDACTED-SECRET]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| p.as_str())).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| RedactionPattern {
                regex: Regex::new(&pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        RedactionPatterns { set, patterns }
    })
}

/// Replace every sensitive match in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let pattern = &patterns.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// `MakeWriter` wrapper that sanitizes each formatted line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A line with no newline must not grow the buffer without bound.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if self.buffer.len() > hard_cap {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_sanitize_measurement_pairs() {
        let sanitized = sanitize("scored glucose=148 bmi: 33.6 age=50");
        assert_eq!(
            sanitized,
            "scored glucose=[REDACTED] bmi: [REDACTED] age=[REDACTED]"
        );
    }

    #[test]
    fn test_sanitize_measurement_labels() {
        let sanitized = sanitize("Glucose Level: 148, Blood Pressure = 72, BloodPressure=72");
        assert!(!sanitized.contains("148"));
        assert!(!sanitized.contains("72"));
        assert!(sanitized.contains("Glucose Level: [REDACTED]"));
    }

    #[test]
    fn test_sanitize_keeps_unrelated_numbers() {
        let input = "scored in 12ms, tier=HIGH percentage_bucket=3";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_sanitize_uuid() {
        let sanitized = sanitize("request 550e8400-e29b-41d4-a716-446655440000 done");
        assert!(sanitized.contains("[REDACTED-UUID]"));
        assert!(!sanitized.contains("550e8400"));
    }

    #[test]
    fn test_sanitize_email() {
        let sanitized = sanitize("Contact: patient@hospital.com");
        assert!(sanitized.contains("[REDACTED-EMAIL]"));
    }

    #[test]
    fn test_sanitize_seed() {
        let sanitized = sanitize("seed=QWxhZGRpbjpvcGVuIHNlc2FtZSB3aXRoIGxvbmcgc2VjcmV0");
        assert_eq!(sanitized, "[REDACTED-SECRET]");
    }

    #[test]
    fn test_manifest_digest_is_not_redacted() {
        let digest = "2fdacac7a0c8b1e4f3d2c1b0a9f8e7d6c5b4a3928170f6e5d4c3b2a1908f18a1";
        let input = format!("manifest_sha256={digest}");
        assert_eq!(sanitize(&input), input);
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("glucose=148 and a long tail of text", 12);
        assert!(sanitized.ends_with(" [TRUNCATED]"));
        assert!(!sanitized.contains("148"));
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("Should lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sanitizing_writer_redacts_lines() {
        let capture = Capture::default();
        let mut writer = SanitizingWriter::new(capture.clone());
        writer.write_all(b"input glucose=").expect("Should write");
        writer.write_all(b"148\nnext line\n").expect("Should write");
        writer.flush().expect("Should flush");

        let written = String::from_utf8(capture.0.lock().expect("Should lock").clone())
            .expect("Should be UTF-8");
        assert_eq!(written, "input glucose=[REDACTED]\nnext line\n");
    }
}
