//!
//! # CRD Definition
//!
//! Identifies a resource type on the API server: group, version and names.
//!
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Crd {
    pub group: &'static str,
    pub version: &'static str,
    pub names: CrdNames,
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CrdNames {
    pub kind: &'static str,
    pub plural: &'static str,
    pub singular: &'static str,
}

pub const DEVFILE_GROUP: &str = "workspace.devfile.io";
pub const V1ALPHA2: &str = "v1alpha2";
