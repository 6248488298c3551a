//! Path templates such as `/projects/{id}/members` or `/static/{rest*}`.
//!
//! # Design Decisions
//! - A parameter always spans a whole segment
//! - `{name*}` captures the remaining segments and must come last
//! - Empty segments are ignored, so `/a//b/` and `/a/b` are the same path
//! - Specificity is the length of the literal prefix before the first parameter

use serde::Serialize;

/// Error raised while parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{0}' must start with '/'")]
    NotAbsolute(String),
    #[error("malformed parameter '{segment}' in template '{template}'")]
    MalformedParam { template: String, segment: String },
    #[error("duplicate parameter '{name}' in template '{template}'")]
    DuplicateParam { template: String, name: String },
    #[error("catch-all parameter must be the last segment of '{0}'")]
    CatchAllNotLast(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    CatchAll(String),
}

/// A parsed path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
    literal_prefix: usize,
}

/// Parameters captured from a path, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl PathTemplate {
    /// Parse a template string.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        if !raw.starts_with('/') {
            return Err(TemplateError::NotAbsolute(raw.to_string()));
        }

        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<String> = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            let segment = match parse_segment(part) {
                Some(segment) => segment,
                None => {
                    return Err(TemplateError::MalformedParam {
                        template: raw.to_string(),
                        segment: part.to_string(),
                    })
                }
            };

            if let Segment::Param(name) | Segment::CatchAll(name) = &segment {
                if names.contains(name) {
                    return Err(TemplateError::DuplicateParam {
                        template: raw.to_string(),
                        name: name.clone(),
                    });
                }
                names.push(name.clone());
            }
            if matches!(segment, Segment::CatchAll(_)) && index + 1 != parts.len() {
                return Err(TemplateError::CatchAllNotLast(raw.to_string()));
            }
            segments.push(segment);
        }

        let literal_prefix = segments
            .iter()
            .take_while(|s| matches!(s, Segment::Literal(_)))
            .map(|s| match s {
                Segment::Literal(text) => text.len() + 1,
                _ => 0,
            })
            .sum();

        Ok(Self {
            raw: raw.to_string(),
            segments,
            literal_prefix,
        })
    }

    /// The template as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Length of the literal text before the first parameter.
    pub fn literal_prefix_len(&self) -> usize {
        self.literal_prefix
    }

    /// Names of all parameters in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) | Segment::CatchAll(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path, returning captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = PathParams::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    if parts.get(index) != Some(&text.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(index)?;
                    params.insert(name.as_str(), *value);
                }
                Segment::CatchAll(name) => {
                    let rest = parts.get(index..).unwrap_or_default().join("/");
                    params.insert(name.as_str(), rest);
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }

    /// Render the template with the given parameters.
    ///
    /// Returns the name of the first parameter that has no value.
    pub fn render(&self, params: &PathParams) -> Result<String, String> {
        let mut path = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            let value = match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Param(name) | Segment::CatchAll(name) => {
                    params.get(name).ok_or_else(|| name.clone())?
                }
            };
            if value.is_empty() {
                continue;
            }
            path.push('/');
            path.push_str(value);
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }
}

fn parse_segment(part: &str) -> Option<Segment> {
    let has_open = part.contains('{');
    let has_close = part.contains('}');
    if !has_open && !has_close {
        return Some(Segment::Literal(part.to_string()));
    }

    let inner = part.strip_prefix('{')?.strip_suffix('}')?;
    let (name, catch_all) = match inner.strip_suffix('*') {
        Some(name) => (name, true),
        None => (inner, false),
    };
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return None;
    }

    Some(if catch_all {
        Segment::CatchAll(name.to_string())
    } else {
        Segment::Param(name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_param_match() {
        let template = PathTemplate::parse("/projects/{id}").unwrap();
        let params = template.matches("/projects/42").unwrap();
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.len(), 1);

        assert!(template.matches("/projects").is_none());
        assert!(template.matches("/projects/42/members").is_none());
        assert!(template.matches("/groups/42").is_none());
        // Trailing and doubled slashes are ignored
        assert!(template.matches("//projects/42/").is_some());
    }

    #[test]
    fn test_catch_all() {
        let template = PathTemplate::parse("/static/{rest*}").unwrap();
        let params = template.matches("/static/css/site.css").unwrap();
        assert_eq!(params.get("rest"), Some("css/site.css"));
        assert_eq!(template.matches("/static").unwrap().get("rest"), Some(""));
        assert!(template.matches("/assets/x").is_none());
    }

    #[test]
    fn test_literal_prefix_length() {
        assert_eq!(PathTemplate::parse("/").unwrap().literal_prefix_len(), 0);
        assert_eq!(PathTemplate::parse("/projects/{id}").unwrap().literal_prefix_len(), 9);
        assert_eq!(PathTemplate::parse("/projects/mine").unwrap().literal_prefix_len(), 14);
        assert_eq!(PathTemplate::parse("/{any*}").unwrap().literal_prefix_len(), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(PathTemplate::parse("projects"), Err(TemplateError::NotAbsolute(_))));
        assert!(matches!(PathTemplate::parse("/p/{id"), Err(TemplateError::MalformedParam { .. })));
        assert!(matches!(
            PathTemplate::parse("/p/v{id}"),
            Err(TemplateError::MalformedParam { .. })
        ));
        assert!(matches!(PathTemplate::parse("/p/{}"), Err(TemplateError::MalformedParam { .. })));
        assert!(matches!(
            PathTemplate::parse("/p/{id}/q/{id}"),
            Err(TemplateError::DuplicateParam { .. })
        ));
        assert!(matches!(
            PathTemplate::parse("/p/{rest*}/tail"),
            Err(TemplateError::CatchAllNotLast(_))
        ));
    }

    #[test]
    fn test_render() {
        let template = PathTemplate::parse("/v1/projects/{id}/{rest*}").unwrap();
        let mut params = PathParams::new();
        params.insert("id", "42");
        params.insert("rest", "members/7");
        assert_eq!(template.render(&params).unwrap(), "/v1/projects/42/members/7");

        let mut partial = PathParams::new();
        partial.insert("id", "42");
        assert_eq!(template.render(&partial), Err("rest".to_string()));

        assert_eq!(PathTemplate::parse("/").unwrap().render(&PathParams::new()).unwrap(), "/");
    }
}
