use serde::Serialize;

/// Characters that may not appear in a log file name. Templates use `{`/`}`
/// placeholders, which stay legal on every platform we care about.
const BAD_FILE_NAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Runtime-mutable daemon settings.
///
/// Folder and file values are templates; `{0}` is the month name, `{1}` the
/// month number, `{2}` the year. Empty log targets mean "don't record",
/// matching the plugin behavior of dropping events until paths are set.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub debug: bool,
    pub requests_folder_path: String,
    pub requests_file_name: String,
    pub responses_folder_path: String,
    pub responses_file_name: String,
    pub fail_time_minutes: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            requests_folder_path: String::new(),
            requests_file_name: String::new(),
            responses_folder_path: String::new(),
            responses_file_name: String::new(),
            fail_time_minutes: 30,
        }
    }
}

/// Tagged settings keys with an explicit name table. Updates dispatch on the
/// variant, never on substring matches against display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Debug,
    RequestsFolderPath,
    RequestsFileName,
    ResponsesFolderPath,
    ResponsesFileName,
    FailTimeMinutes,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::Debug,
        SettingKey::RequestsFolderPath,
        SettingKey::RequestsFileName,
        SettingKey::ResponsesFolderPath,
        SettingKey::ResponsesFileName,
        SettingKey::FailTimeMinutes,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debug" => Some(SettingKey::Debug),
            "requests_folder_path" => Some(SettingKey::RequestsFolderPath),
            "requests_file_name" => Some(SettingKey::RequestsFileName),
            "responses_folder_path" => Some(SettingKey::ResponsesFolderPath),
            "responses_file_name" => Some(SettingKey::ResponsesFileName),
            "fail_time_minutes" => Some(SettingKey::FailTimeMinutes),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::Debug => "debug",
            SettingKey::RequestsFolderPath => "requests_folder_path",
            SettingKey::RequestsFileName => "requests_file_name",
            SettingKey::ResponsesFolderPath => "responses_folder_path",
            SettingKey::ResponsesFileName => "responses_file_name",
            SettingKey::FailTimeMinutes => "fail_time_minutes",
        }
    }
}

impl Settings {
    /// Apply one key/value update. On any validation error the previous value
    /// is kept untouched.
    pub fn apply(&mut self, key: SettingKey, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match key {
            SettingKey::Debug => self.debug = parse_bool(value)?,
            SettingKey::RequestsFolderPath => {
                self.requests_folder_path = normalize_folder(value);
            }
            SettingKey::RequestsFileName => {
                self.requests_file_name = checked_file_name(value)?;
            }
            SettingKey::ResponsesFolderPath => {
                self.responses_folder_path = normalize_folder(value);
            }
            SettingKey::ResponsesFileName => {
                self.responses_file_name = checked_file_name(value)?;
            }
            SettingKey::FailTimeMinutes => {
                let n: i64 = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("not a number: {value:?}"))?;
                if n < 0 {
                    anyhow::bail!("fail time must be >= 0, got {n}");
                }
                self.fail_time_minutes = n;
            }
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> anyhow::Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("not a boolean: {v:?}"),
    }
}

// Windows-style config values show up with backslashes; the path handling
// downstream only speaks forward slashes.
fn normalize_folder(v: &str) -> String {
    v.replace('\\', "/").trim().to_string()
}

fn checked_file_name(v: &str) -> anyhow::Result<String> {
    if v.chars()
        .any(|c| BAD_FILE_NAME_CHARS.contains(&c) || c.is_control())
    {
        anyhow::bail!("invalid file name: {v:?}");
    }
    Ok(v.to_string())
}
