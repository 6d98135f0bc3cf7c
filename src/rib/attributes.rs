use std::net::IpAddr;

use bgp_rs::{ASPath, Origin, Segment};

use crate::api::{AsSegment, PathAttrs, AS_SEQUENCE, AS_SET};
use crate::utils::ParseError;

/// Path attributes as stored in the RIB
#[derive(Clone, Debug)]
pub struct PathAttributes {
    pub next_hop: IpAddr,
    pub origin: Origin,
    pub as_path: ASPath,
}

impl PathAttributes {
    pub fn from_spec(attrs: &PathAttrs) -> Result<Self, ParseError> {
        let origin = match attrs.origin.to_lowercase().as_str() {
            "igp" => Origin::IGP,
            "egp" => Origin::EGP,
            "incomplete" | "" => Origin::INCOMPLETE,
            origin => return Err(ParseError::new(format!("Unsupported origin '{}'", origin))),
        };
        let segments = attrs
            .as_path
            .iter()
            .map(|segment| match segment.segment_type {
                AS_SEQUENCE => Ok(Segment::AS_SEQUENCE(segment.numbers.clone())),
                AS_SET => Ok(Segment::AS_SET(segment.numbers.clone())),
                other => Err(ParseError::new(format!(
                    "Unsupported AS_PATH segment type {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            next_hop: attrs.next_hop,
            origin,
            as_path: ASPath { segments },
        })
    }

    pub fn to_spec(&self) -> PathAttrs {
        let origin = match self.origin {
            Origin::IGP => "igp",
            Origin::EGP => "egp",
            Origin::INCOMPLETE => "incomplete",
        };
        let as_path = self
            .as_path
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::AS_SEQUENCE(asns) => AsSegment {
                    segment_type: AS_SEQUENCE,
                    numbers: asns.clone(),
                },
                Segment::AS_SET(asns) => AsSegment {
                    segment_type: AS_SET,
                    numbers: asns.clone(),
                },
            })
            .collect();
        PathAttrs {
            origin: origin.to_string(),
            next_hop: self.next_hop,
            as_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_attributes() {
        let attrs = PathAttributes::from_spec(&PathAttrs::local()).unwrap();
        assert!(matches!(attrs.origin, Origin::IGP));
        assert_eq!(attrs.next_hop, "0.0.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(attrs.as_path.segments.len(), 1);
        match &attrs.as_path.segments[0] {
            Segment::AS_SEQUENCE(asns) => assert!(asns.is_empty()),
            _ => panic!("Expected AS_SEQUENCE"),
        }

        let spec = attrs.to_spec();
        assert_eq!(spec.origin, "igp");
        assert_eq!(spec.as_path, PathAttrs::local().as_path);
    }

    #[test]
    fn test_unsupported_attributes() {
        let mut attrs = PathAttrs::local();
        attrs.origin = "static".to_string();
        assert!(PathAttributes::from_spec(&attrs).is_err());

        let mut attrs = PathAttrs::local();
        attrs.as_path[0].segment_type = 9;
        assert!(PathAttributes::from_spec(&attrs).is_err());
    }
}
