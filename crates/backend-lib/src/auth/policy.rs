//! Path-based authorization policy.
//!
//! Patterns use Ant-style wildcards: `**` spans any number of whole path
//! segments, `*` stays within one segment, `?` is one character.
use regex::Regex;

use crate::error::AppError;

/// One compiled allow-set pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, AppError> {
        if !pattern.starts_with('/') {
            return Err(AppError::Config(format!(
                "path pattern '{pattern}' must start with '/'"
            )));
        }

        let mut expr = String::from("^");
        for segment in pattern.split('/').skip(1) {
            if segment == "**" {
                // `/a/**` also matches `/a` itself
                expr.push_str("(?:/.*)?");
                continue;
            }
            expr.push('/');
            for ch in segment.chars() {
                match ch {
                    '*' => expr.push_str("[^/]*"),
                    '?' => expr.push_str("[^/]"),
                    other => expr.push_str(&regex::escape(&other.to_string())),
                }
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .map_err(|e| AppError::Config(format!("bad path pattern '{pattern}': {e}")))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match against a request path; any query string is ignored
    pub fn matches(&self, path: &str) -> bool {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        self.regex.is_match(path)
    }
}

/// Flat allow-set plus the rule for everything else
#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    public_patterns: Vec<PathPattern>,
    protected_default: bool,
}

impl AuthorizationPolicy {
    pub fn new<S: AsRef<str>>(
        public_patterns: &[S],
        protected_default: bool,
    ) -> Result<Self, AppError> {
        let public_patterns = public_patterns
            .iter()
            .map(|p| PathPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            public_patterns,
            protected_default,
        })
    }

    /// Whether `path` is in the allow-set
    pub fn is_public(&self, path: &str) -> bool {
        self.public_patterns.iter().any(|p| p.matches(path))
    }

    /// Whether a request for `path` needs an authenticated principal
    pub fn requires_authentication(&self, path: &str) -> bool {
        self.protected_default && !self.is_public(path)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.public_patterns.iter().map(PathPattern::as_str)
    }
}
