//! Manifest form types and upstream payload construction
//!
//! The customs API payloads are a compatibility contract: field names and the
//! literal default substituted for every omitted field are fixed. Defaults
//! live in [`ManifestDefaults`], one explicit literal per field, and payload
//! construction validates everything in one place before any network call.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Fallback master bill-of-lading number when the session carries none
pub const DEFAULT_MBOL_NUMBER: &str = "MBOLBTS0602";

/// Fallback house bill-of-lading number when the session carries none
pub const DEFAULT_HBOL_NUMBER: &str = "HBOL12BTS6701";

/// Filing disposition for a manifest document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendAs {
    Add,
    Replace,
    Update,
    Cancel,
}

impl SendAs {
    /// Wire representation expected by the documents API
    pub fn as_str(&self) -> &'static str {
        match self {
            SendAs::Add => "add",
            SendAs::Replace => "replace",
            SendAs::Update => "update",
            SendAs::Cancel => "cancel",
        }
    }
}

impl fmt::Display for SendAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SendAs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(SendAs::Add),
            "replace" => Ok(SendAs::Replace),
            "update" => Ok(SendAs::Update),
            "cancel" => Ok(SendAs::Cancel),
            other => Err(Error::Validation(format!(
                "Invalid sendAs value: {}. Must be one of: add, replace, update, cancel",
                other
            ))),
        }
    }
}

/// Raw manifest form fields as submitted by the caller
///
/// Every field is optional; [`build_document`] substitutes the documented
/// default for each omitted field independently. Field names match the form
/// keys of the upstream contract exactly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestForm {
    #[serde(rename = "type")]
    pub document_type: Option<String>,
    #[serde(rename = "sendAs")]
    pub send_as: Option<String>,
    #[serde(rename = "dateOfArrival")]
    pub date_of_arrival: Option<String>,
    #[serde(rename = "timeOfArrival")]
    pub time_of_arrival: Option<String>,
    #[serde(rename = "entryType")]
    pub entry_type: Option<String>,
    #[serde(rename = "modeOfTransport")]
    pub mode_of_transport: Option<String>,
    #[serde(rename = "IORType")]
    pub ior_type: Option<String>,
    #[serde(rename = "IORNumber")]
    pub ior_number: Option<String>,
    #[serde(rename = "portOfEntry")]
    pub port_of_entry: Option<String>,
    #[serde(rename = "manifestNumber")]
    pub manifest_number: Option<String>,
    #[serde(rename = "filerContactName")]
    pub filer_contact_name: Option<String>,
    #[serde(rename = "filerPhoneNumber")]
    pub filer_phone_number: Option<String>,
    #[serde(rename = "bondType")]
    pub bond_type: Option<String>,
    #[serde(rename = "billType")]
    pub bill_type: Option<String>,
    #[serde(rename = "MBOLNumber")]
    pub mbol_number: Option<String>,
    #[serde(rename = "HBOLNumber")]
    pub hbol_number: Option<String>,
    #[serde(rename = "equipmentNumber")]
    pub equipment_number: Option<String>,
    #[serde(rename = "vesselName")]
    pub vessel_name: Option<String>,
    #[serde(rename = "sellerName")]
    pub seller_name: Option<String>,
    #[serde(rename = "sellerAddress1")]
    pub seller_address1: Option<String>,
    #[serde(rename = "sellerCity")]
    pub seller_city: Option<String>,
    #[serde(rename = "sellerCountry")]
    pub seller_country: Option<String>,
    #[serde(rename = "consigneeName")]
    pub consignee_name: Option<String>,
    #[serde(rename = "consigneeIdentifierCode")]
    pub consignee_identifier_code: Option<String>,
    #[serde(rename = "consigneeAddress1")]
    pub consignee_address1: Option<String>,
    #[serde(rename = "consigneeCity")]
    pub consignee_city: Option<String>,
    #[serde(rename = "consigneePostalCode")]
    pub consignee_postal_code: Option<String>,
    #[serde(rename = "consigneeTaxID")]
    pub consignee_tax_id: Option<String>,
    #[serde(rename = "consigneeStateOrProvince")]
    pub consignee_state_or_province: Option<String>,
    #[serde(rename = "consigneeCountry")]
    pub consignee_country: Option<String>,
    #[serde(rename = "totalQuantity")]
    pub total_quantity: Option<String>,
    #[serde(rename = "knownImporter")]
    pub known_importer: Option<String>,
    #[serde(rename = "perishableGoods")]
    pub perishable_goods: Option<String>,
    #[serde(rename = "shipmentDescription")]
    pub shipment_description: Option<String>,
    #[serde(rename = "shipmentHTSNumber")]
    pub shipment_hts_number: Option<String>,
    #[serde(rename = "shipmentCountryOfOrigin")]
    pub shipment_country_of_origin: Option<String>,
    #[serde(rename = "shipmentLineItemValue")]
    pub shipment_line_item_value: Option<String>,
}

impl ManifestForm {
    /// Validated `sendAs` value, defaulting to `add` when absent
    pub fn send_as(&self) -> Result<SendAs> {
        match self.send_as.as_deref() {
            Some(raw) => raw.parse(),
            None => Ok(SendAs::Add),
        }
    }

    /// Correlation identifiers to store in the session after a successful
    /// submit, with the documented fallbacks when absent from the form
    pub fn correlation_identifiers(&self) -> (String, String) {
        (
            self.mbol_number
                .clone()
                .unwrap_or_else(|| DEFAULT_MBOL_NUMBER.to_string()),
            self.hbol_number
                .clone()
                .unwrap_or_else(|| DEFAULT_HBOL_NUMBER.to_string()),
        )
    }
}

/// Fixed literal default for every manifest field
///
/// One entry per leaf field of the documents payload, including the single
/// shipment line. These values are part of the upstream compatibility
/// contract and are substituted independently per omitted field.
#[derive(Debug, Clone)]
pub struct ManifestDefaults {
    pub document_type: &'static str,
    pub date_of_arrival: i64,
    pub time_of_arrival: &'static str,
    pub entry_type: &'static str,
    pub mode_of_transport: &'static str,
    pub ior_type: &'static str,
    pub ior_number: &'static str,
    pub port_of_entry: &'static str,
    pub manifest_number: &'static str,
    pub filer_contact_name: &'static str,
    pub filer_phone_number: i64,
    pub bond_type: &'static str,
    pub bill_type: &'static str,
    pub mbol_number: &'static str,
    pub hbol_number: &'static str,
    pub equipment_number: &'static str,
    pub vessel_name: &'static str,
    pub seller_name: &'static str,
    pub seller_address1: &'static str,
    pub seller_city: &'static str,
    pub seller_country: &'static str,
    pub consignee_name: &'static str,
    pub consignee_identifier_code: &'static str,
    pub consignee_address1: &'static str,
    pub consignee_city: &'static str,
    pub consignee_postal_code: &'static str,
    pub consignee_tax_id: &'static str,
    pub consignee_state_or_province: &'static str,
    pub consignee_country: &'static str,
    pub total_quantity: i64,
    pub known_importer: &'static str,
    pub perishable_goods: &'static str,
    pub shipment_description: &'static str,
    pub shipment_hts_number: &'static str,
    pub shipment_country_of_origin: &'static str,
    pub shipment_line_item_value: &'static str,
}

impl Default for ManifestDefaults {
    fn default() -> Self {
        Self {
            document_type: "abi-type86",
            date_of_arrival: 20221013,
            time_of_arrival: "0010",
            entry_type: "86",
            mode_of_transport: "10",
            ior_type: "EI",
            ior_number: "12-1234567XX",
            port_of_entry: "1102",
            manifest_number: "ABC01",
            filer_contact_name: "BTS TXT",
            filer_phone_number: 123457890,
            bond_type: "0",
            bill_type: "M",
            mbol_number: DEFAULT_MBOL_NUMBER,
            hbol_number: DEFAULT_HBOL_NUMBER,
            equipment_number: "1234567890",
            vessel_name: "Name",
            seller_name: "Test Name Seller",
            seller_address1: "Test Address",
            seller_city: "BEIJING",
            seller_country: "CN",
            consignee_name: "Test Name Consignee",
            consignee_identifier_code: "EI",
            consignee_address1: "Test Address",
            consignee_city: "PICKERING",
            consignee_postal_code: "12345",
            consignee_tax_id: "12-123456789",
            consignee_state_or_province: "OH",
            consignee_country: "US",
            total_quantity: 5,
            known_importer: "Y",
            perishable_goods: "N",
            shipment_description: "TEST BTS",
            shipment_hts_number: "2903992000",
            shipment_country_of_origin: "CN",
            shipment_line_item_value: "750",
        }
    }
}

/// Substitute the default when the field is omitted
fn text<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().unwrap_or(default)
}

/// Parse an integer field, substituting the default when omitted
fn integer(name: &str, value: &Option<String>, default: i64) -> Result<i64> {
    match value.as_deref() {
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            Error::Validation(format!(
                "Invalid input data: {} must be an integer, got '{}'",
                name, raw
            ))
        }),
        None => Ok(default),
    }
}

/// Build the documents API payload from the form, validating `sendAs` and the
/// integer fields and substituting the documented default for every omitted
/// field
pub fn build_document(form: &ManifestForm, defaults: &ManifestDefaults) -> Result<Value> {
    let send_as = form.send_as()?;

    let body = json!({
        "dateOfArrival": integer("dateOfArrival", &form.date_of_arrival, defaults.date_of_arrival)?,
        "timeOfArrival": text(&form.time_of_arrival, defaults.time_of_arrival),
        "entryType": text(&form.entry_type, defaults.entry_type),
        "modeOfTransport": text(&form.mode_of_transport, defaults.mode_of_transport),
        "IORType": text(&form.ior_type, defaults.ior_type),
        "IORNumber": text(&form.ior_number, defaults.ior_number),
        "portOfEntry": text(&form.port_of_entry, defaults.port_of_entry),
        "manifestNumber": text(&form.manifest_number, defaults.manifest_number),
        "filerContactName": text(&form.filer_contact_name, defaults.filer_contact_name),
        "filerPhoneNumber": integer(
            "filerPhoneNumber",
            &form.filer_phone_number,
            defaults.filer_phone_number
        )?,
        "bondType": text(&form.bond_type, defaults.bond_type),
        "billType": text(&form.bill_type, defaults.bill_type),
        "MBOLNumber": text(&form.mbol_number, defaults.mbol_number),
        "HBOLNumber": text(&form.hbol_number, defaults.hbol_number),
        "equipmentNumber": text(&form.equipment_number, defaults.equipment_number),
        "vesselName": text(&form.vessel_name, defaults.vessel_name),
        "sellerName": text(&form.seller_name, defaults.seller_name),
        "sellerAddress1": text(&form.seller_address1, defaults.seller_address1),
        "sellerAddress2": null,
        "sellerCity": text(&form.seller_city, defaults.seller_city),
        "sellerCountry": text(&form.seller_country, defaults.seller_country),
        "consigneeName": text(&form.consignee_name, defaults.consignee_name),
        "consigneeIdentifierCode": text(
            &form.consignee_identifier_code,
            defaults.consignee_identifier_code
        ),
        "consigneeAddress1": text(&form.consignee_address1, defaults.consignee_address1),
        "consigneeAddress2": null,
        "consigneeCity": text(&form.consignee_city, defaults.consignee_city),
        "consigneePostalCode": text(&form.consignee_postal_code, defaults.consignee_postal_code),
        "consigneeTaxID": text(&form.consignee_tax_id, defaults.consignee_tax_id),
        "consigneeStateOrProvince": text(
            &form.consignee_state_or_province,
            defaults.consignee_state_or_province
        ),
        "consigneeCountry": text(&form.consignee_country, defaults.consignee_country),
        "totalQuantity": integer("totalQuantity", &form.total_quantity, defaults.total_quantity)?,
        "knownImporter": text(&form.known_importer, defaults.known_importer),
        "perishableGoods": text(&form.perishable_goods, defaults.perishable_goods),
        "shipments": [
            {
                "description": text(&form.shipment_description, defaults.shipment_description),
                "HTSNumber": text(&form.shipment_hts_number, defaults.shipment_hts_number),
                "countryOfOrigin": text(
                    &form.shipment_country_of_origin,
                    defaults.shipment_country_of_origin
                ),
                "lineItemValue": text(
                    &form.shipment_line_item_value,
                    defaults.shipment_line_item_value
                ),
            }
        ],
    });

    Ok(json!({
        "type": text(&form.document_type, defaults.document_type),
        "send": false,
        "sendAs": send_as.as_str(),
        "version": 2,
        "body": [body],
    }))
}

/// HTS verification request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewHtsRequest {
    #[serde(rename = "HTSNumber")]
    pub hts_number: Option<String>,
    pub description: Option<String>,
}

/// Build the review-hts API payload
pub fn build_review_hts(mbol_number: &str, hts_number: &str, description: Option<&str>) -> Value {
    let mut payload = json!({
        "MBOLNumber": mbol_number,
        "HBOLNumber": null,
        "onlyIssues": false,
        "skip": 0,
        "htsNumbers": [hts_number],
    });
    if let Some(description) = description {
        payload["description"] = json!(description);
    }
    payload
}

/// Build the send API payload; the house bill is wrapped as a one-element list
pub fn build_send(mbol_number: &str, hbol_number: &str) -> Value {
    json!({
        "type": "abi-type86",
        "sendAs": "add",
        "MBOLNumber": mbol_number,
        "HBOLNumber": [hbol_number],
        "entryNumber": null,
        "sendAllHBOLS": false,
    })
}
