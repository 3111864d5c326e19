// i18n.rs
//
// Runtime string tables:
// - Built-in tables for `id` and `en` are compiled in from assets/i18n/.
// - A file at <exe_dir>/assets/i18n/<lang>.json or ./assets/i18n/<lang>.json
//   overrides the built-in table for that language, key by key.
// - Lookup: tr("key") / tr_with("key", &[("name", ...)]) with {name} placeholders.
// - Missing keys fall back to `id`, then to the key itself.

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const FALLBACK_LANG: &str = "id";

/// Languages offered in the UI, with their display names.
pub const LANGUAGES: [(&str, &str); 2] = [("id", "Bahasa Indonesia"), ("en", "English")];

#[derive(Debug, Clone)]
pub struct I18n {
    pub lang: String,
    map: HashMap<String, String>,
    fallback_map: HashMap<String, String>,
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

fn builtin(lang: &str) -> Option<&'static str> {
    match lang {
        "id" => Some(include_str!("../assets/i18n/id.json")),
        "en" => Some(include_str!("../assets/i18n/en.json")),
        _ => None,
    }
}

fn parse_map(text: &str) -> Option<HashMap<String, String>> {
    match serde_json::from_str(text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("ignoring malformed string table: {}", e);
            None
        }
    }
}

fn load_json_map(path: &Path) -> Option<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    parse_map(&text)
}

/// Find assets/i18n/<lang>.json next to the executable or in the working dir.
fn find_lang_file(lang: &str) -> Option<PathBuf> {
    let file = format!("{}.json", lang);

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join("i18n").join(&file);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join("i18n").join(&file);
    p.exists().then_some(p)
}

fn load_lang(lang: &str) -> HashMap<String, String> {
    let mut map = builtin(lang).and_then(parse_map).unwrap_or_default();

    if let Some(p) = find_lang_file(lang) {
        if let Some(overrides) = load_json_map(&p) {
            log::debug!("string overrides for {} from {}", lang, p.display());
            map.extend(overrides);
        }
    }

    if map.is_empty() {
        log::warn!("no strings for language {:?}, falling back to {}", lang, FALLBACK_LANG);
    }
    map
}

/// Initialize global i18n. Later calls replace the current language.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();

    let map = load_lang(&lang);
    let fallback_map = if lang == FALLBACK_LANG {
        map.clone()
    } else {
        load_lang(FALLBACK_LANG)
    };

    let i = I18n {
        lang,
        map,
        fallback_map,
    };

    if let Some(lock) = I18N.get() {
        if let Ok(mut w) = lock.write() {
            *w = i;
        }
    } else {
        let _ = I18N.set(RwLock::new(i));
    }
}

fn get_locked() -> Option<std::sync::RwLockReadGuard<'static, I18n>> {
    I18N.get().and_then(|l| l.read().ok())
}

pub fn current_lang() -> String {
    get_locked()
        .map(|i| i.lang.clone())
        .unwrap_or_else(|| FALLBACK_LANG.to_string())
}

/// Get localized text by key. If key missing, returns key itself.
pub fn tr(key: &str) -> String {
    let Some(i) = get_locked() else {
        return key.to_string();
    };

    if let Some(v) = i.map.get(key) {
        return v.clone();
    }
    if let Some(v) = i.fallback_map.get(key) {
        return v.clone();
    }
    key.to_string()
}

/// Get localized text and substitute `{name}` placeholders.
/// Any placeholder not provided is kept as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        let placeholder = format!("{{{}}}", k);
        s = s.replace(&placeholder, v);
    }
    s
}
