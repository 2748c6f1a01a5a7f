use crate::config::ProvisioningConfig;
use crate::secret::SecretMaterial;

pub const SECRET_KEY: &str = "HOOPS_SECRET_KEY";
pub const DEMO_MODE: &str = "HOOPS_DEMO_MODE";
pub const DB_PATH: &str = "HOOPS_DB_PATH";
pub const ALLOWED_ORIGINS: &str = "HOOPS_ALLOWED_ORIGINS";
pub const BASE_URL: &str = "HOOPS_BASE_URL";
pub const SUPERUSER_EMAIL: &str = "HOOPS_SUPERUSER_EMAIL";

/// Mail delivery credentials, left blank for the operator.
pub const MAIL_CREDENTIALS: [&str; 2] = ["GMAIL_ADDRESS", "GMAIL_APP_PASSWORD"];

/// SMS delivery credentials, left blank for the operator.
pub const SMS_CREDENTIALS: [&str; 3] = ["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_FROM_NUMBER"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry(String, String),
    Verbatim(String),
}

/// Line-oriented `KEY=VALUE` file read by the supervised service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvironmentFile {
    lines: Vec<Line>,
}

impl EnvironmentFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the file for a fresh run.
    #[must_use]
    pub fn for_config(config: &ProvisioningConfig, secret: &SecretMaterial) -> Self {
        let mut file = Self::new()
            .comment("Managed by trebuchet. Regenerated (with a new secret) on every run.")
            .set(SECRET_KEY, secret.expose())
            .set(DEMO_MODE, if config.settings().demo_mode { "1" } else { "0" })
            .set(DB_PATH, &config.db_path().display().to_string())
            .set(ALLOWED_ORIGINS, &config.allowed_origins().join(","))
            .set(BASE_URL, &config.access_url(false))
            .set(SUPERUSER_EMAIL, "")
            .blank()
            .comment("E-mail notifications");
        for key in MAIL_CREDENTIALS {
            file = file.set(key, "");
        }
        file = file.blank().comment("SMS notifications");
        for key in SMS_CREDENTIALS {
            file = file.set(key, "");
        }
        file
    }

    /// Parse existing content, keeping comments and unknown lines
    /// untouched.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .map(|raw| {
                let trimmed = raw.trim_start();
                if trimmed.starts_with('#') {
                    return Line::Verbatim(raw.to_string());
                }
                match raw.split_once('=') {
                    Some((key, value)) if !key.trim().is_empty() => {
                        Line::Entry(key.trim().to_string(), value.to_string())
                    }
                    _ => Line::Verbatim(raw.to_string()),
                }
            })
            .collect();
        Self { lines }
    }

    /// Set `key`, replacing the first existing entry in place or
    /// appending a new one.
    #[must_use]
    pub fn set(mut self, key: &str, value: &str) -> Self {
        let existing = self.lines.iter_mut().find_map(|line| match line {
            Line::Entry(k, v) if k == key => Some(v),
            _ => None,
        });
        match existing {
            Some(v) => *v = value.to_string(),
            None => self.lines.push(Line::Entry(key.to_string(), value.to_string())),
        }
        self
    }

    #[must_use]
    pub fn comment(mut self, text: &str) -> Self {
        self.lines.push(Line::Verbatim(format!("# {text}")));
        self
    }

    #[must_use]
    pub fn blank(mut self) -> Self {
        self.lines.push(Line::Verbatim(String::new()));
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }

    /// Keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry(k, _) => Some(k.as_str()),
            Line::Verbatim(_) => None,
        })
    }

    #[must_use]
    pub fn origins(&self) -> Vec<String> {
        self.get(ALLOWED_ORIGINS)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Switch `domain`'s origin and base URL from http to https.
    ///
    /// Only entries for `domain` change, duplicates produced by the
    /// switch collapse into one, and applying it twice is a no-op.
    /// Returns whether anything changed.
    pub fn upgrade_origins(&mut self, domain: &str) -> bool {
        let insecure = format!("http://{domain}");
        let secure = format!("https://{domain}");

        let mut upgraded: Vec<String> = Vec::new();
        for origin in self.origins() {
            let origin = if origin == insecure { secure.clone() } else { origin };
            if !upgraded.contains(&origin) {
                upgraded.push(origin);
            }
        }

        let before = self.clone();
        if self.get(ALLOWED_ORIGINS).is_some() {
            *self = std::mem::take(self).set(ALLOWED_ORIGINS, &upgraded.join(","));
        }
        if self.get(BASE_URL) == Some(insecure.as_str()) {
            *self = std::mem::take(self).set(BASE_URL, &secure);
        }
        *self != before
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry(k, v) => {
                    out.push_str(k);
                    out.push('=');
                    out.push_str(v);
                }
                Line::Verbatim(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}
