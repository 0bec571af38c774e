use std::fmt;

/// A single `key=value` segment of a query string, kept exactly as written.
/// Nothing is percent-decoded, so `%26` and friends survive a rewrite untouched.
/// Values written through `TrackingUrl` are percent-encoded on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub key: String,
    /// `None` for a bare key without `=`.
    pub value: Option<String>,
}

impl QueryParam {
    fn parse(segment: &str) -> Self {
        match segment.split_once('=') {
            Some((key, value)) => QueryParam {
                key: key.to_string(),
                value: Some(value.to_string()),
            },
            None => QueryParam {
                key: segment.to_string(),
                value: None,
            },
        }
    }
}

impl fmt::Display for QueryParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => f.write_str(&self.key),
        }
    }
}

/// A tracking URL split into the part before `?`, its ordered query parameters
/// (duplicates allowed) and the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingUrl {
    base: String,
    has_query: bool,
    params: Vec<QueryParam>,
    fragment: Option<String>,
}

impl TrackingUrl {
    pub fn parse(raw: &str) -> Self {
        let (rest, fragment) = match raw.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (raw, None),
        };
        let (base, query) = match rest.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (rest, None),
        };
        let params = match query {
            Some(q) if !q.is_empty() => q.split('&').map(QueryParam::parse).collect(),
            _ => Vec::new(),
        };

        TrackingUrl {
            base: base.to_string(),
            has_query: query.is_some(),
            params,
            fragment,
        }
    }

    /// First value of `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == name)
            .and_then(|p| p.value.as_deref())
    }

    /// Sets every occurrence of `name` to `value`, appending the parameter when absent.
    pub fn set(&mut self, name: &str, value: &str) {
        if !self.replace(name, value) {
            self.params.push(QueryParam {
                key: name.to_string(),
                value: Some(urlencoding::encode(value).into_owned()),
            });
        }
    }

    /// Sets every occurrence of `name` to `value`. Returns false, and leaves the URL
    /// unchanged, when the parameter is absent.
    pub fn replace(&mut self, name: &str, value: &str) -> bool {
        let encoded = urlencoding::encode(value);
        let mut replaced = false;
        for param in self.params.iter_mut().filter(|p| p.key == name) {
            param.value = Some(encoded.to_string());
            replaced = true;
        }
        replaced
    }

    /// Rewrites each `name` whose value starts with `prefix` to `prefix` + `suffix`.
    pub fn replace_after_prefix(&mut self, name: &str, prefix: &str, suffix: &str) -> bool {
        let encoded = urlencoding::encode(suffix);
        let mut replaced = false;
        for param in self.params.iter_mut().filter(|p| p.key == name) {
            if param.value.as_deref().is_some_and(|v| v.starts_with(prefix)) {
                param.value = Some(format!("{prefix}{encoded}"));
                replaced = true;
            }
        }
        replaced
    }

    /// Injects `publisher_id` into every parameter named in `macro_spec`, in order.
    /// No-op when either input is empty.
    pub fn apply_publisher_macros(&mut self, publisher_id: &str, macro_spec: &str) {
        if publisher_id.is_empty() {
            return;
        }
        for name in parse_macro_spec(macro_spec) {
            self.set(name, publisher_id);
        }
    }
}

impl fmt::Display for TrackingUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        if self.has_query || !self.params.is_empty() {
            f.write_str("?")?;
            for (index, param) in self.params.iter().enumerate() {
                if index > 0 {
                    f.write_str("&")?;
                }
                write!(f, "{param}")?;
            }
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Splits a comma separated macro list, dropping whitespace, a leading `&` and
/// empty entries.
pub fn parse_macro_spec(macro_spec: &str) -> impl Iterator<Item = &str> {
    macro_spec
        .split(',')
        .map(|m| m.trim().trim_start_matches('&').trim())
        .filter(|m| !m.is_empty())
}

/// Sets `name` to `value` in `url`, inserting the parameter if absent.
pub fn substitute_param(url: &str, name: &str, value: &str) -> String {
    let mut parsed = TrackingUrl::parse(url);
    parsed.set(name, value);
    parsed.to_string()
}

pub fn apply_publisher_macros(url: &str, publisher_id: &str, macro_spec: &str) -> String {
    if url.is_empty() || publisher_id.is_empty() || macro_spec.is_empty() {
        return url.to_string();
    }
    let mut parsed = TrackingUrl::parse(url);
    parsed.apply_publisher_macros(publisher_id, macro_spec);
    parsed.to_string()
}
