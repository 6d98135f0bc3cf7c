use std::fmt;
use std::net::IpAddr;

use bgp_rs::{AFI, SAFI};
use ipnetwork::IpNetwork;
use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Family {
    pub afi: AFI,
    pub safi: SAFI,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.afi, self.safi)
    }
}

impl Family {
    pub fn new(afi: AFI, safi: SAFI) -> Self {
        Self { afi, safi }
    }

    pub fn ipv4_unicast() -> Self {
        Self::new(AFI::IPV4, SAFI::Unicast)
    }

    /// Does an address belong to this family's AFI
    pub fn matches_addr(&self, addr: &IpAddr) -> bool {
        matches!(
            (self.afi, addr),
            (AFI::IPV4, IpAddr::V4(_)) | (AFI::IPV6, IpAddr::V6(_))
        )
    }

    /// Does a network belong to this family's AFI
    pub fn matches_network(&self, network: &IpNetwork) -> bool {
        self.matches_addr(&network.ip())
    }
}

impl Serialize for Family {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Family {
    fn deserialize<D>(deserializer: D) -> Result<Family, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let parts: Vec<String> = s
            .trim()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        if parts.len() != 2 {
            return Err(serde::de::Error::custom(format!(
                "Incorrect family format: '{}'",
                s
            )));
        }
        let afi = match parts[0].as_str() {
            "ipv4" => AFI::IPV4,
            "ipv6" => AFI::IPV6,
            family => {
                return Err(serde::de::Error::custom(format!(
                    "Unsupported AFI: '{}'",
                    family
                )))
            }
        };
        let safi = match parts[1].as_str() {
            "unicast" => SAFI::Unicast,
            sfamily => {
                return Err(serde::de::Error::custom(format!(
                    "Unsupported SAFI: '{}'",
                    sfamily
                )))
            }
        };
        Ok(Family::new(afi, safi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{Error, StrDeserializer};
    use serde::de::IntoDeserializer;

    #[test]
    fn test_serialize_family() {
        assert_eq!(&Family::ipv4_unicast().to_string(), "IPv4 Unicast");
        assert_eq!(
            serde_json::to_string(&Family::new(AFI::IPV6, SAFI::Unicast)).unwrap(),
            "\"IPv6 Unicast\""
        );
    }

    #[test]
    fn test_deserialize_family() {
        let deserializer: StrDeserializer<Error> = "ipv6 unicast".into_deserializer();
        let family = Family::deserialize(deserializer).unwrap();
        assert_eq!(family, Family::new(AFI::IPV6, SAFI::Unicast));

        // Displayed form is accepted back
        let family: Family = serde_json::from_str("\"IPv4 Unicast\"").unwrap();
        assert_eq!(family, Family::ipv4_unicast());

        let deserializer: StrDeserializer<Error> = "ipv4 flow".into_deserializer();
        assert!(Family::deserialize(deserializer).is_err());
    }

    #[test]
    fn test_matches_addr() {
        let family = Family::ipv4_unicast();
        assert!(family.matches_addr(&"10.0.0.0".parse().unwrap()));
        assert!(!family.matches_addr(&"3001::".parse().unwrap()));
        assert!(family.matches_network(&"10.0.0.0/8".parse().unwrap()));
    }
}
