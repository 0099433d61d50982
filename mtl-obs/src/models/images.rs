//! Photographic evidence per specimen

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the three required viewpoints per specimen
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhotoAngle {
    FrontFailure,
    DigitalReading,
    BackFailure,
}

impl PhotoAngle {
    pub const ALL: [PhotoAngle; 3] = [
        PhotoAngle::FrontFailure,
        PhotoAngle::DigitalReading,
        PhotoAngle::BackFailure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PhotoAngle::FrontFailure => "front-failure",
            PhotoAngle::DigitalReading => "digital-reading",
            PhotoAngle::BackFailure => "back-failure",
        }
    }

    /// Prefix of the stored image key (`front_failure_1`, ...)
    fn key_prefix(self) -> &'static str {
        match self {
            PhotoAngle::FrontFailure => "front_failure",
            PhotoAngle::DigitalReading => "digital_reading",
            PhotoAngle::BackFailure => "back_failure",
        }
    }
}

impl fmt::Display for PhotoAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoAngle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhotoAngle::ALL
            .iter()
            .copied()
            .find(|angle| angle.as_str() == s || angle.key_prefix() == s)
            .ok_or_else(|| format!("unknown photo angle '{}'", s))
    }
}

/// Composite key: specimen position (0-based) plus viewpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageKey {
    pub specimen: usize,
    pub angle: PhotoAngle,
}

impl ImageKey {
    pub fn new(specimen: usize, angle: PhotoAngle) -> Self {
        Self { specimen, angle }
    }

    /// Stored form: `{angle}_{specimen number}` with a 1-based number
    pub fn to_wire(self) -> String {
        format!("{}_{}", self.angle.key_prefix(), self.specimen + 1)
    }

    pub fn from_wire(key: &str) -> Option<Self> {
        let (prefix, number) = key.rsplit_once('_')?;
        let angle = PhotoAngle::ALL
            .iter()
            .copied()
            .find(|angle| angle.key_prefix() == prefix)?;
        let number: usize = number.parse().ok()?;
        if number == 0 {
            return None;
        }
        Some(Self::new(number - 1, angle))
    }
}

/// Captured photos keyed by specimen and angle
///
/// Values are data-URI encoded images. Serialized as the flat
/// `capturedImages` object; unrecognised keys are dropped on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct CapturedImageSet {
    images: BTreeMap<ImageKey, String>,
}

impl CapturedImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an image, returning the one it replaced
    pub fn insert(&mut self, key: ImageKey, image: String) -> Option<String> {
        self.images.insert(key, image)
    }

    pub fn remove(&mut self, key: ImageKey) -> Option<String> {
        self.images.remove(&key)
    }

    pub fn get(&self, key: ImageKey) -> Option<&str> {
        self.images.get(&key).map(String::as_str)
    }

    pub fn contains(&self, key: ImageKey) -> bool {
        self.images.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Angles still missing for a specimen, in capture order
    pub fn missing_angles(&self, specimen: usize) -> Vec<PhotoAngle> {
        PhotoAngle::ALL
            .iter()
            .copied()
            .filter(|angle| !self.contains(ImageKey::new(specimen, *angle)))
            .collect()
    }

    /// Drop the photos of a removed specimen and move later specimens down one slot
    pub fn remove_specimen(&mut self, specimen: usize) {
        let images = std::mem::take(&mut self.images);
        self.images = images
            .into_iter()
            .filter(|(key, _)| key.specimen != specimen)
            .map(|(key, image)| {
                if key.specimen > specimen {
                    (ImageKey::new(key.specimen - 1, key.angle), image)
                } else {
                    (key, image)
                }
            })
            .collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageKey, &str)> {
        self.images.iter().map(|(key, image)| (*key, image.as_str()))
    }
}

impl From<BTreeMap<String, String>> for CapturedImageSet {
    fn from(raw: BTreeMap<String, String>) -> Self {
        let mut images = BTreeMap::new();
        for (key, image) in raw {
            match ImageKey::from_wire(&key) {
                Some(parsed) => {
                    images.insert(parsed, image);
                }
                None => tracing::warn!(key = %key, "Ignoring image with unrecognised key"),
            }
        }
        Self { images }
    }
}

impl From<CapturedImageSet> for BTreeMap<String, String> {
    fn from(set: CapturedImageSet) -> Self {
        set.images
            .into_iter()
            .map(|(key, image)| (key.to_wire(), image))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_key_wire_format_is_one_based() {
        let key = ImageKey::new(0, PhotoAngle::DigitalReading);
        assert_eq!(key.to_wire(), "digital_reading_1");
        assert_eq!(ImageKey::from_wire("back_failure_3"), Some(ImageKey::new(2, PhotoAngle::BackFailure)));
        assert_eq!(ImageKey::from_wire("back_failure_0"), None);
        assert_eq!(ImageKey::from_wire("side_view_1"), None);
    }

    #[test]
    fn test_missing_angles() {
        let mut set = CapturedImageSet::new();
        set.insert(ImageKey::new(1, PhotoAngle::FrontFailure), "data:a".into());
        set.insert(ImageKey::new(1, PhotoAngle::BackFailure), "data:b".into());

        assert_eq!(set.missing_angles(1), vec![PhotoAngle::DigitalReading]);
        assert_eq!(set.missing_angles(0).len(), 3);
    }

    #[test]
    fn test_remove_specimen_shifts_later_photos() {
        let mut set = CapturedImageSet::new();
        set.insert(ImageKey::new(0, PhotoAngle::FrontFailure), "first".into());
        set.insert(ImageKey::new(1, PhotoAngle::FrontFailure), "second".into());
        set.insert(ImageKey::new(2, PhotoAngle::FrontFailure), "third".into());

        set.remove_specimen(1);

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(ImageKey::new(0, PhotoAngle::FrontFailure)), Some("first"));
        assert_eq!(set.get(ImageKey::new(1, PhotoAngle::FrontFailure)), Some("third"));
        assert!(set.get(ImageKey::new(2, PhotoAngle::FrontFailure)).is_none());
    }

    #[test]
    fn test_serde_uses_flat_string_keys() {
        let mut set = CapturedImageSet::new();
        set.insert(ImageKey::new(0, PhotoAngle::FrontFailure), "data:image/jpeg;base64,AA".into());

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["front_failure_1"], "data:image/jpeg;base64,AA");

        let parsed: CapturedImageSet = serde_json::from_str(
            r#"{"front_failure_1": "x", "thumbnail": "y"}"#,
        )
        .unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_angle_parses_both_spellings() {
        assert_eq!("back-failure".parse::<PhotoAngle>(), Ok(PhotoAngle::BackFailure));
        assert_eq!("digital_reading".parse::<PhotoAngle>(), Ok(PhotoAngle::DigitalReading));
        assert!("top".parse::<PhotoAngle>().is_err());
    }
}
