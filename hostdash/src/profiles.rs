//! Connection profiles: load/save a JSON mapping of profile name -> { url, tls_ca, poll_secs, timeout_secs }
//! Stored under XDG config dir: $XDG_CONFIG_HOME/hostdash/profiles.json (fallback ~/.config/hostdash/profiles.json)

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, io, path::PathBuf, time::Duration};

use hostdash_client::api::DEFAULT_TIMEOUT;
use hostdash_client::store::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca: Option<String>,
    /// Overview refresh period; 30s when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_secs: Option<u64>,
    /// Per-request timeout; 15s when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProfileEntry {
    pub fn new(url: String, tls_ca: Option<String>) -> Self {
        Self {
            url,
            tls_ca,
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Same endpoint and CA; tuning fields don't count.
    pub fn same_target(&self, other: &ProfileEntry) -> bool {
        self.url == other.url && self.tls_ca == other.tls_ca
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("hostdash")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hostdash")
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

pub fn load_profiles() -> ProfilesFile {
    let path = profiles_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => ProfilesFile::default(),
    }
}

pub fn save_profiles(p: &ProfilesFile) -> io::Result<()> {
    let path = profiles_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(p).map_err(io::Error::other)?;
    fs::write(path, data)
}

pub enum ResolveProfile {
    /// Use the provided runtime inputs (maybe persisted by the caller).
    Direct(ProfileEntry),
    /// Loaded from an existing profile entry.
    Loaded(ProfileEntry),
    /// Should prompt user to select among profile names
    PromptSelect(Vec<String>),
    /// Should prompt user to create a new profile (name)
    PromptCreate(String),
    /// No profile could be resolved (e.g., missing arguments)
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub tls_ca: Option<String>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        match (self.url, self.profile_name) {
            (Some(url), _) => ResolveProfile::Direct(ProfileEntry::new(url, self.tls_ca)),
            (None, Some(name)) => match pf.profiles.get(&name) {
                Some(entry) => {
                    let mut entry = entry.clone();
                    // a CA on the command line overrides the stored one for this run
                    if self.tls_ca.is_some() {
                        entry.tls_ca = self.tls_ca;
                    }
                    ResolveProfile::Loaded(entry)
                }
                None => ResolveProfile::PromptCreate(name),
            },
            (None, None) if pf.profiles.is_empty() => ResolveProfile::None,
            (None, None) => ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with(name: &str, url: &str) -> ProfilesFile {
        let mut pf = ProfilesFile::default();
        pf.profiles
            .insert(name.into(), ProfileEntry::new(url.into(), None));
        pf
    }

    #[test]
    fn url_wins_over_stored_profile() {
        let pf = file_with("prod", "http://one/api");
        let req = ProfileRequest {
            profile_name: Some("prod".into()),
            url: Some("http://two/api".into()),
            tls_ca: None,
        };
        assert!(matches!(req.resolve(&pf), ResolveProfile::Direct(e) if e.url == "http://two/api"));
    }

    #[test]
    fn name_only_loads_or_prompts() {
        let pf = file_with("prod", "http://one/api");
        let load = ProfileRequest {
            profile_name: Some("prod".into()),
            url: None,
            tls_ca: None,
        };
        assert!(matches!(load.resolve(&pf), ResolveProfile::Loaded(e) if e.url == "http://one/api"));
        let create = ProfileRequest {
            profile_name: Some("staging".into()),
            url: None,
            tls_ca: None,
        };
        assert!(matches!(create.resolve(&pf), ResolveProfile::PromptCreate(n) if n == "staging"));
    }

    #[test]
    fn nothing_given_selects_or_gives_up() {
        let req = || ProfileRequest {
            profile_name: None,
            url: None,
            tls_ca: None,
        };
        assert!(matches!(req().resolve(&ProfilesFile::default()), ResolveProfile::None));
        assert!(matches!(
            req().resolve(&file_with("a", "http://a/api")),
            ResolveProfile::PromptSelect(names) if names == vec!["a".to_string()]
        ));
    }

    #[test]
    fn tuning_defaults() {
        let mut e = ProfileEntry::new("http://x/api".into(), None);
        assert_eq!(e.poll_interval(), Duration::from_secs(30));
        assert_eq!(e.timeout(), Duration::from_secs(15));
        e.poll_secs = Some(5);
        e.timeout_secs = Some(0);
        assert_eq!(e.poll_interval(), Duration::from_secs(5));
        assert_eq!(e.timeout(), Duration::from_secs(15));
    }
}
