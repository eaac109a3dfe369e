use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{PrintableStringRef, SetOfVec};
use der::{Any, Tag, Tagged};
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::CertError;

/// Seconds in the fixed-length year used for validity windows.
pub const SECONDS_PER_YEAR: i64 = 31_536_000;

pub const COUNTRY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
pub const STATE_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
pub const LOCALITY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
pub const ORGANIZATION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
pub const ORGANIZATION_UNIT_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
pub const COMMON_NAME_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// What a caller supplies to get a certificate issued.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `validity_years` - Lifetime in fixed 365-day years.
#[derive(Clone, Debug, Builder)]
pub struct CertBasicInfo {
    pub subject: DistinguishedName,
    pub validity_years: u32,
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// Attributes are always written in the order C, ST, L, O, OU, CN.
/// Absent optional attributes are skipped; empty strings are written as
/// empty values.
///
/// # Fields
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
/// * `common_name` - The common name (CN).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    fn attributes(&self) -> [(ObjectIdentifier, Option<&str>); 6] {
        [
            (COUNTRY_OID, self.country.as_deref()),
            (STATE_OID, self.state.as_deref()),
            (LOCALITY_OID, self.locality.as_deref()),
            (ORGANIZATION_OID, self.organization.as_deref()),
            (ORGANIZATION_UNIT_OID, self.organization_unit.as_deref()),
            (COMMON_NAME_OID, Some(self.common_name.as_str())),
        ]
    }

    /// Converts the distinguished name to an X.509 name, one attribute per RDN.
    ///
    /// The country must be a two-letter PrintableString code.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName, CertError> {
        if let Some(country) = self.country.as_deref() {
            check_country(country)?;
        }
        let mut rdns = Vec::with_capacity(6);
        for (oid, value) in self.attributes() {
            let Some(value) = value else { continue };
            let tag = if PrintableStringRef::new(value).is_ok() {
                Tag::PrintableString
            } else {
                Tag::Utf8String
            };
            let atv = AttributeTypeAndValue {
                oid,
                value: Any::new(tag, value.as_bytes())?,
            };
            rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?));
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name.
    ///
    /// String attributes other than the six known ones are ignored; when an
    /// attribute repeats the last occurrence wins. Use [`attribute_values`]
    /// to read every occurrence.
    pub fn from_x509_name(x509dn: &x509_cert::name::DistinguishedName) -> Self {
        let mut dn = DistinguishedName::default();
        for (oid, value) in string_attributes(x509dn) {
            match oid {
                COUNTRY_OID => dn.country = Some(value),
                STATE_OID => dn.state = Some(value),
                LOCALITY_OID => dn.locality = Some(value),
                ORGANIZATION_OID => dn.organization = Some(value),
                ORGANIZATION_UNIT_OID => dn.organization_unit = Some(value),
                COMMON_NAME_OID => dn.common_name = value,
                _ => {}
            }
        }
        dn
    }
}

/// Every string value of attribute `oid` in `name`, in name order.
pub fn attribute_values(
    name: &x509_cert::name::DistinguishedName,
    oid: ObjectIdentifier,
) -> Vec<String> {
    string_attributes(name)
        .filter(|(attr_oid, _)| *attr_oid == oid)
        .map(|(_, value)| value)
        .collect()
}

fn string_attributes(
    name: &x509_cert::name::DistinguishedName,
) -> impl Iterator<Item = (ObjectIdentifier, String)> + '_ {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .filter_map(|attr| match attr.value.tag() {
            Tag::PrintableString | Tag::Utf8String | Tag::Ia5String => Some((
                attr.oid,
                String::from_utf8_lossy(attr.value.value()).into_owned(),
            )),
            other => {
                tracing::debug!(
                    oid = %attr.oid,
                    tag = %other,
                    "skipping non-string name attribute"
                );
                None
            }
        })
}

fn check_country(country: &str) -> Result<(), CertError> {
    if country.len() != 2 || PrintableStringRef::new(country).is_err() {
        return Err(CertError::InvalidInput(format!(
            "country must be a two-letter code, got {country:?}"
        )));
    }
    Ok(())
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// A window starting now (truncated to whole seconds) and lasting
    /// `years * 365` days. Leap days are not accounted for.
    pub fn for_years(years: u32) -> Result<Self, CertError> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self::for_years_from(now, years)
    }

    /// Same as [`Validity::for_years`] but anchored at a unix timestamp.
    pub fn for_years_from(not_before: i64, years: u32) -> Result<Self, CertError> {
        let not_after = i64::from(years)
            .checked_mul(SECONDS_PER_YEAR)
            .and_then(|span| not_before.checked_add(span))
            .ok_or_else(|| {
                CertError::InvalidInput(format!("validity of {years} years overflows"))
            })?;
        let to_time = |secs: i64| {
            OffsetDateTime::from_unix_timestamp(secs)
                .map_err(|e| CertError::InvalidInput(e.to_string()))
        };
        Ok(Self {
            not_before: to_time(not_before)?,
            not_after: to_time(not_after)?,
        })
    }
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self, CertError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, CertError> {
        E::from_x509_extension_value(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_dn() -> DistinguishedName {
        DistinguishedName::builder()
            .country("CN")
            .state("Guangdong")
            .locality("Shenzhen")
            .organization("Org1")
            .organization_unit("Peer")
            .common_name("node1.org1")
            .build()
    }

    #[test]
    fn test_name_attribute_order() {
        let name = full_dn().as_x509_name().unwrap();
        let oids: Vec<_> = name
            .0
            .iter()
            .map(|rdn| rdn.0.iter().next().unwrap().oid)
            .collect();
        assert_eq!(
            oids,
            vec![
                COUNTRY_OID,
                STATE_OID,
                LOCALITY_OID,
                ORGANIZATION_OID,
                ORGANIZATION_UNIT_OID,
                COMMON_NAME_OID
            ]
        );
    }

    #[test]
    fn test_name_encoding_decoding() {
        let original = full_dn();
        let name = original.as_x509_name().unwrap();
        assert_eq!(DistinguishedName::from_x509_name(&name), original);
    }

    #[test]
    fn test_non_printable_value_uses_utf8() {
        let dn = DistinguishedName::builder()
            .common_name("节点一")
            .organization("a@b")
            .build();
        let name = dn.as_x509_name().unwrap();
        let tags: Vec<_> = name
            .0
            .iter()
            .map(|rdn| rdn.0.iter().next().unwrap().value.tag())
            .collect();
        assert_eq!(tags, vec![Tag::Utf8String, Tag::Utf8String]);
        assert_eq!(DistinguishedName::from_x509_name(&name), dn);
    }

    #[test]
    fn test_country_must_be_two_printable_letters() {
        for country in ["中国", "CHN", "C", "C@"] {
            let dn = DistinguishedName::builder()
                .country(country)
                .common_name("node1")
                .build();
            assert!(
                matches!(dn.as_x509_name(), Err(CertError::InvalidInput(_))),
                "{country} accepted"
            );
        }
        let name = full_dn().as_x509_name().unwrap();
        let country = &name.0[0].0.iter().next().unwrap().value;
        assert_eq!(country.tag(), Tag::PrintableString);
    }

    #[test]
    fn test_attribute_values_keeps_repeats() {
        let mut name = full_dn().as_x509_name().unwrap();
        let unit = name.0[4].clone();
        name.0.insert(4, unit);
        assert_eq!(
            attribute_values(&name, ORGANIZATION_UNIT_OID),
            vec!["Peer".to_string(), "Peer".to_string()]
        );
        assert_eq!(
            attribute_values(&name, COMMON_NAME_OID),
            vec!["node1.org1".to_string()]
        );
        let serial_number = ObjectIdentifier::new_unwrap("2.5.4.5");
        assert!(attribute_values(&name, serial_number).is_empty());
    }

    #[test]
    fn test_validity_uses_fixed_year_length() {
        // 2024 is a leap year; the window must still be exactly 365 days.
        let start = 1_704_067_200; // 2024-01-01T00:00:00Z
        let validity = Validity::for_years_from(start, 1).unwrap();
        assert_eq!(
            (validity.not_after - validity.not_before).whole_seconds(),
            SECONDS_PER_YEAR
        );
        assert_eq!(validity.not_after.ordinal(), 366);
    }
}
