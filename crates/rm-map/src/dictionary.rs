//! Interned string dictionary (place names and the like).
//!
//! A dictionary section is a run of NUL-terminated UTF-8 strings; the
//! ordinal of a string is its [`StringId`].  Id 0 is always the empty string.
//! Reverse lookups go through a [`HashIndex`] keyed by [`hash_string`].

use rm_core::StringId;

use crate::database::{MapDatabase, Section};
use crate::hash::{hash_string, HashIndex};
use crate::{MapError, MapResult};

pub struct Dictionary {
    name:    String,
    strings: Vec<String>,
    index:   HashIndex,
}

impl Dictionary {
    /// Section `string/<name>` of `db`, checked to hold one count per byte.
    pub fn section<'a>(db: &'a MapDatabase, name: &str) -> MapResult<&'a Section> {
        let path = format!("string/{name}");
        let section = db.get_subsection(&path)?;
        if section.size() != section.count() {
            log::error!("invalid {path} structure in map {}", db.name());
            return Err(MapError::InvalidStructure {
                section: path,
                size:    section.size(),
                count:   section.count(),
                stride:  1,
            });
        }
        Ok(section)
    }

    /// Parse NUL-terminated strings.
    pub fn from_bytes(name: &str, data: &[u8]) -> MapResult<Self> {
        let mut strings = vec![String::new()];
        if !data.is_empty() {
            let body = data.strip_suffix(&[0]).unwrap_or(data);
            strings = body
                .split(|&b| b == 0)
                .map(|raw| std::str::from_utf8(raw).map(str::to_string))
                .collect::<Result<_, _>>()
                .map_err(|e| MapError::Parse(format!("dictionary {name}: {e}")))?;
            if strings.first().is_some_and(|s| !s.is_empty()) {
                return Err(MapError::Parse(format!("dictionary {name} does not start with the empty string")));
            }
        }
        if strings.len() > u16::MAX as usize {
            return Err(MapError::Build(format!("dictionary {name} holds more than {} strings", u16::MAX)));
        }

        let mut index = HashIndex::new(format!("dictionary/{name}"), strings.len());
        for (i, s) in strings.iter().enumerate() {
            index.add(hash_string(s), i as u32)?;
        }
        log::debug!("opened dictionary {name} with {} strings", strings.len());

        Ok(Self { name: name.to_string(), strings, index })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }

    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id.index()).map(String::as_str)
    }

    /// Id of `s`, if interned.
    pub fn find(&self, s: &str) -> Option<StringId> {
        self.index
            .chain(hash_string(s))
            .find(|&i| self.strings[i as usize] == s)
            .map(|i| StringId(i as u16))
    }

    /// Encode `strings` as a dictionary section body.  The caller must put
    /// the empty string first.
    pub fn encode<'a>(strings: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
        let mut out = Vec::new();
        for s in strings {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        out
    }
}
