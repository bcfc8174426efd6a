//! The template vocabulary of the contract forms this tool was built for.
//!
//! The filling engine does not depend on any of this: it substitutes
//! whatever keys the data map holds. The form is one convenient way to
//! produce such a map from configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fill::DataMap;

pub const OBJECT_DESC: &str = "object_desc";
pub const SUB_CONTRACTOR: &str = "sub_contractor";
pub const SUB_CONTRACTOR_NAME: &str = "sub_contractor_name";
pub const CONTRACTOR: &str = "contractor";
pub const CONTRACTOR_NAME: &str = "contractor_name";
pub const DESIGN_ORG: &str = "design_org";
pub const DESIGN_ORG_NAME: &str = "design_org_name";
pub const CUSTOMER: &str = "customer";
pub const CUSTOMER_NAME: &str = "customer_name";
pub const CERTIFICATION: &str = "certification";
pub const DESIGN_DOC: &str = "design_doc";
pub const SUB_CONTRACTOR_CO: &str = "sub_contractor_co";
pub const CONTRACTOR_CO: &str = "contractor_co";
pub const DESIGN_CO: &str = "design_co";
pub const CUSTOMER_CO: &str = "customer_co";

/// Number of object instances on one form.
pub const INSTANCE_COUNT: usize = 9;

/// `object_name_1` .. `object_name_9`.
pub fn object_name_key(index: usize) -> String {
    format!("object_name_{}", index + 1)
}

/// `sr_num_1` .. `sr_num_9`.
pub fn sr_num_key(index: usize) -> String {
    format!("sr_num_{}", index + 1)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sr_num: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormData {
    pub object_desc: String,
    pub sub_contractor: String,
    pub sub_contractor_name: String,
    pub contractor: String,
    pub contractor_name: String,
    pub design_org: String,
    pub design_org_name: String,
    pub customer: String,
    pub customer_name: String,
    pub certification: String,
    pub design_doc: String,
    pub sub_contractor_co: String,
    pub contractor_co: String,
    pub design_co: String,
    pub customer_co: String,
    pub instances: Vec<InstanceData>,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            object_desc: String::new(),
            sub_contractor: String::new(),
            sub_contractor_name: String::new(),
            contractor: String::new(),
            contractor_name: String::new(),
            design_org: String::new(),
            design_org_name: String::new(),
            customer: String::new(),
            customer_name: String::new(),
            certification: String::new(),
            design_doc: String::new(),
            sub_contractor_co: String::new(),
            contractor_co: String::new(),
            design_co: String::new(),
            customer_co: String::new(),
            instances: vec![InstanceData::default(); INSTANCE_COUNT],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("expected {expected} objects, found {found}")]
    InstanceCount { expected: usize, found: usize },
    #[error("name and serial number are required for every object (incomplete: {})", list_numbers(.0))]
    IncompleteInstances(Vec<usize>),
}

fn list_numbers(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FormData {
    /// Every form key, blank values included.
    pub fn to_data_map(&self) -> DataMap {
        let fixed = [
            (OBJECT_DESC, &self.object_desc),
            (SUB_CONTRACTOR, &self.sub_contractor),
            (SUB_CONTRACTOR_NAME, &self.sub_contractor_name),
            (CONTRACTOR, &self.contractor),
            (CONTRACTOR_NAME, &self.contractor_name),
            (DESIGN_ORG, &self.design_org),
            (DESIGN_ORG_NAME, &self.design_org_name),
            (CUSTOMER, &self.customer),
            (CUSTOMER_NAME, &self.customer_name),
            (CERTIFICATION, &self.certification),
            (DESIGN_DOC, &self.design_doc),
            (SUB_CONTRACTOR_CO, &self.sub_contractor_co),
            (CONTRACTOR_CO, &self.contractor_co),
            (DESIGN_CO, &self.design_co),
            (CUSTOMER_CO, &self.customer_co),
        ];
        let mut map: DataMap = fixed
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (i, inst) in self.instances.iter().enumerate() {
            map.insert(object_name_key(i), inst.name.clone());
            map.insert(sr_num_key(i), inst.sr_num.clone());
        }
        map
    }

    /// All instances must carry a non-blank name and serial number.
    pub fn validate(&self) -> Result<(), FormError> {
        if self.instances.len() != INSTANCE_COUNT {
            return Err(FormError::InstanceCount {
                expected: INSTANCE_COUNT,
                found: self.instances.len(),
            });
        }
        let incomplete: Vec<usize> = self
            .instances
            .iter()
            .enumerate()
            .filter(|(_, inst)| inst.name.trim().is_empty() || inst.sr_num.trim().is_empty())
            .map(|(i, _)| i)
            .collect();
        if incomplete.is_empty() {
            Ok(())
        } else {
            Err(FormError::IncompleteInstances(incomplete))
        }
    }
}
