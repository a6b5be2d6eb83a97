use rand::Rng;
use std::fmt;
use uuid::{Builder, Uuid};

/// Name of one simulated edge device, and of the storage namespace holding its history.
///
/// Rendered as a lowercase hyphenated v4 UUID, which is also a valid object-store
/// bucket name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Generate a fresh identity from the operating system's entropy source.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_name(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token naming where a measurement is taken: `F{facility}.H{host}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SensorLocation(String);

impl SensorLocation {
    /// Draw a new location token from `rng`.
    ///
    /// Both halves are v4 UUIDs built from the supplied random source, so a seeded
    /// generator yields the same token every time.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let facility = Builder::from_random_bytes(rng.gen()).into_uuid();
        let host = Builder::from_random_bytes(rng.gen()).into_uuid();
        Self(format!("F{}.H{}", facility, host))
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is being measured, e.g. `temp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter(String);

impl Parameter {
    pub const TEMPERATURE: &'static str = "temp";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Self::new(Self::TEMPERATURE)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_device_identity_is_hyphenated_uuid() {
        let device = DeviceIdentity::generate();
        let parsed = Uuid::parse_str(device.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(device.as_str(), parsed.hyphenated().to_string());
    }

    #[test]
    fn test_device_identities_are_distinct() {
        let a = DeviceIdentity::generate();
        let b = DeviceIdentity::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sensor_location_format() {
        let mut rng = StdRng::seed_from_u64(7);
        let location = SensorLocation::generate(&mut rng);

        let token = location.as_str();
        assert!(token.starts_with('F'));
        let (facility, host) = token[1..].split_once(".H").unwrap();
        assert!(Uuid::parse_str(facility).is_ok());
        assert!(Uuid::parse_str(host).is_ok());
    }

    #[test]
    fn test_sensor_location_is_deterministic_for_seed() {
        let a = SensorLocation::generate(&mut StdRng::seed_from_u64(42));
        let b = SensorLocation::generate(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_parameter() {
        assert_eq!(Parameter::default().as_str(), "temp");
    }
}
