//! INI file configuration adapter.
//!
//! Thin [`ConfigPort`] wrapper over `configparser`. Typed getters fall back
//! to the caller's default on a missing key or an unparseable value; the
//! stricter checks live in `domain::config_validation`, not here.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut ini = Ini::new();
        ini.load(&path).map_err(|reason| {
            std::io::Error::other(format!("{}: {reason}", path.as_ref().display()))
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut ini = Ini::new();
        ini.read(content.to_string())?;
        Ok(Self { ini })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.ini.getint(section, key) {
            Ok(Some(value)) => value,
            _ => default,
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.ini.getfloat(section, key) {
            Ok(Some(value)) => value,
            _ => default,
        }
    }

    // getboolcoerce accepts true/false, yes/no, t/f, y/n, 1/0.
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.ini.getboolcoerce(section, key) {
            Ok(Some(value)) => value,
            _ => default,
        }
    }
}
