//! Search result items returned by the clinic API

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::page::SearchResultPage;

/// Declares a closed set of wire strings with `as_str`, `Display` and `FromStr`
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            /// Every value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Get the value as it appears on the wire
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| {
                        let expected: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("invalid value '{}', expected one of: {}", s, expected.join(", "))
                    })
            }
        }
    };
}

wire_enum!(
    /// Patient sex
    Sex {
        Male => "male",
        Female => "female",
    }
);

wire_enum!(
    /// Whether the patient is followed for a pregnancy
    PatientType {
        Pregnant => "pregnant",
        Regular => "regular",
    }
);

wire_enum!(
    /// Care status of a patient record
    PatientStatus {
        Active => "active",
        Inactive => "inactive",
        Converted => "converted",
        Postpartum => "postpartum",
        Completed => "completed",
    }
);

wire_enum!(
    /// Position of a dose in a vaccine schedule
    DoseNumber {
        First => "1st dose",
        Second => "2nd dose",
        Third => "3rd dose",
    }
);

/// Patient search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSearchResult {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub age: u32,
    pub sex: Sex,
    pub patient_type: PatientType,
    pub status: PatientStatus,
    pub facility_id: i64,
    pub created_at: String,
    #[serde(default)]
    pub expected_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_menstrual_period: Option<NaiveDate>,
    #[serde(default)]
    pub diagnosis_date: Option<NaiveDate>,
}

/// Vaccination search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationSearchResult {
    pub id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_phone: String,
    pub vaccine_purchase_id: i64,
    pub vaccine_name: String,
    pub dose_number: DoseNumber,
    pub dose_date: NaiveDate,
    pub batch_number: String,
    pub vaccine_price: f64,
    #[serde(default)]
    pub administered_by_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
}

/// Payment search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSearchResult {
    pub id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub patient_phone: String,
    pub vaccine_purchase_id: i64,
    pub vaccine_name: String,
    pub amount: f64,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub received_by_id: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
}

pub type PatientSearchResponse = SearchResultPage<PatientSearchResult>;
pub type VaccinationSearchResponse = SearchResultPage<VaccinationSearchResult>;
/// Payments additionally carry `total_amount`, summed by the server
pub type PaymentSearchResponse = SearchResultPage<PaymentSearchResult>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_enums_round_trip_through_strings() {
        assert_eq!("1st dose".parse::<DoseNumber>(), Ok(DoseNumber::First));
        assert_eq!("POSTPARTUM".parse::<PatientStatus>(), Ok(PatientStatus::Postpartum));
        assert_eq!(DoseNumber::Third.to_string(), "3rd dose");
        assert_eq!(serde_json::to_value(Sex::Female).expect("json"), json!("female"));

        let err = "unknown".parse::<PatientType>().expect_err("invalid");
        assert!(err.contains("pregnant, regular"));
    }

    #[test]
    fn test_decode_patient_page() {
        let page: PatientSearchResponse = serde_json::from_value(json!({
            "items": [{
                "id": 3,
                "name": "Amina Yusuf",
                "phone": "0803555123",
                "age": 27,
                "sex": "female",
                "patient_type": "pregnant",
                "status": "active",
                "facility_id": 2,
                "created_at": "2024-03-01T09:15:00Z",
                "expected_delivery_date": "2024-09-12"
            }],
            "total_count": 1,
            "page": 1,
            "page_size": 20,
            "total_pages": 1,
            "has_next": false,
            "has_previous": false,
            "query_time_ms": 4.2
        }))
        .expect("decode");

        let patient = &page.items[0];
        assert_eq!(patient.patient_type, PatientType::Pregnant);
        assert_eq!(
            patient.expected_delivery_date,
            NaiveDate::from_ymd_opt(2024, 9, 12)
        );
        assert_eq!(patient.diagnosis_date, None);
        assert_eq!(page.query_time_ms, Some(4.2));
        assert_eq!(page.total_amount, None);
    }

    #[test]
    fn test_decode_vaccination_and_payment_items() {
        let vaccination: VaccinationSearchResult = serde_json::from_value(json!({
            "id": 10,
            "patient_id": 3,
            "patient_name": "Amina Yusuf",
            "patient_phone": "0803555123",
            "vaccine_purchase_id": 8,
            "vaccine_name": "Hepatitis B",
            "dose_number": "2nd dose",
            "dose_date": "2024-04-02",
            "batch_number": "HB-2231",
            "vaccine_price": 4500.0,
            "administered_by_id": null,
            "created_at": "2024-04-02T10:00:00Z"
        }))
        .expect("decode vaccination");
        assert_eq!(vaccination.dose_number, DoseNumber::Second);
        assert_eq!(vaccination.administered_by_id, None);

        let page: PaymentSearchResponse = serde_json::from_value(json!({
            "items": [{
                "id": 4,
                "patient_id": 3,
                "patient_name": "Amina Yusuf",
                "patient_phone": "0803555123",
                "vaccine_purchase_id": 8,
                "vaccine_name": "Hepatitis B",
                "amount": 1500.5,
                "payment_date": "2024-04-02",
                "payment_method": "cash",
                "created_at": "2024-04-02T10:05:00Z"
            }],
            "total_count": 1,
            "page": 1,
            "page_size": 20,
            "total_pages": 1,
            "has_next": false,
            "has_previous": false,
            "total_amount": 1500.5
        }))
        .expect("decode payments");
        assert_eq!(page.total_amount, Some(1500.5));
        assert_eq!(page.items[0].payment_method.as_deref(), Some("cash"));
    }
}
