//! Entity descriptors.
//!
//! Every record type the API manages is described here once: its table, its
//! input schema, which fields must stay unique, which parents must exist
//! before a write, and which dependent tables block a delete. The handlers
//! and the repository are generic over these descriptors, so adding an
//! entity means adding a descriptor, a migration table, and nothing else.

use crate::validate::{opt, req, FieldKind, Schema};

/// A field whose value may not collide with any existing row.
#[derive(Debug, Clone, Copy)]
pub struct UniqueRule {
    pub field: &'static str,
    /// Human label used in conflict messages.
    pub label: &'static str,
}

/// A foreign key that must point at an existing row before a write goes in.
#[derive(Debug, Clone, Copy)]
pub struct ParentRef {
    pub field: &'static str,
    pub table: &'static str,
    pub label: &'static str,
    /// Parent columns joined into list responses, empty for none.
    pub display: &'static [&'static str],
}

/// A table whose rows keep this entity's rows from being deleted.
#[derive(Debug, Clone, Copy)]
pub struct DependentSet {
    pub table: &'static str,
    pub fk: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct EntityDef {
    /// Singular name used in messages ("family").
    pub name: &'static str,
    /// Path segment under /api/data ("families").
    pub route: &'static str,
    pub table: &'static str,
    pub schema: Schema,
    pub unique: &'static [UniqueRule],
    pub parents: &'static [ParentRef],
    pub dependents: &'static [DependentSet],
    /// Reference data: create and read only.
    pub immutable: bool,
    pub order_by: &'static str,
}

pub static GEO_UNIT: EntityDef = EntityDef {
    name: "geographic unit",
    route: "geo-units",
    table: "geo_units",
    schema: Schema {
        fields: &[
            req("province_code", FieldKind::Digits { len: 2 }),
            req("province_name", FieldKind::Text { min: 2, max: 100 }),
            req("regency_code", FieldKind::Digits { len: 2 }),
            req("regency_name", FieldKind::Text { min: 2, max: 100 }),
            req("district_code", FieldKind::Digits { len: 3 }),
            req("district_name", FieldKind::Text { min: 2, max: 100 }),
            req("village_code", FieldKind::Digits { len: 3 }),
            req("village_name", FieldKind::Text { min: 2, max: 100 }),
        ],
    },
    unique: &[],
    parents: &[],
    dependents: &[],
    immutable: true,
    order_by: "id",
};

pub static FAMILY: EntityDef = EntityDef {
    name: "family",
    route: "families",
    table: "families",
    schema: Schema {
        fields: &[
            req("card_number", FieldKind::Digits { len: 16 }),
            req("head_name", FieldKind::Text { min: 2, max: 100 }),
            req("member_total", FieldKind::Integer { min: 1, max: 30 }),
            req("address", FieldKind::Text { min: 3, max: 200 }),
            req("geo_unit_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            opt("note", FieldKind::Text { min: 0, max: 500 }),
        ],
    },
    unique: &[UniqueRule { field: "card_number", label: "family card number" }],
    parents: &[ParentRef {
        field: "geo_unit_id",
        table: "geo_units",
        label: "geographic unit",
        display: &["province_name", "regency_name", "district_name", "village_name"],
    }],
    dependents: &[
        DependentSet { table: "family_members", fk: "family_id" },
        DependentSet { table: "survey_records", fk: "family_id" },
        DependentSet { table: "employment_records", fk: "family_id" },
        DependentSet { table: "housing_records", fk: "family_id" },
        DependentSet { table: "agriculture_records", fk: "family_id" },
        DependentSet { table: "assistance_records", fk: "family_id" },
        DependentSet { table: "disability_records", fk: "family_id" },
    ],
    immutable: false,
    order_by: "id",
};

pub static FAMILY_MEMBER: EntityDef = EntityDef {
    name: "family member",
    route: "members",
    table: "family_members",
    schema: Schema {
        fields: &[
            req("family_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            req("seq_no", FieldKind::Integer { min: 1, max: 99 }),
            req("name", FieldKind::Text { min: 2, max: 100 }),
            req("nik", FieldKind::Digits { len: 16 }),
            req("gender", FieldKind::OneOf(&["male", "female"])),
            req(
                "relation",
                FieldKind::OneOf(&[
                    "head",
                    "spouse",
                    "child",
                    "parent",
                    "in_law",
                    "grandchild",
                    "domestic_helper",
                    "other",
                ]),
            ),
            req(
                "marital_status",
                FieldKind::OneOf(&["single", "married", "divorced", "widowed"]),
            ),
            req(
                "religion",
                FieldKind::OneOf(&[
                    "islam",
                    "protestant",
                    "catholic",
                    "hindu",
                    "buddhist",
                    "confucian",
                    "other",
                ]),
            ),
            req(
                "education",
                FieldKind::OneOf(&[
                    "none",
                    "elementary",
                    "junior_high",
                    "senior_high",
                    "diploma",
                    "bachelor",
                    "master",
                    "doctorate",
                ]),
            ),
            req("birth_date", FieldKind::Date),
        ],
    },
    unique: &[UniqueRule { field: "nik", label: "NIK" }],
    parents: &[ParentRef {
        field: "family_id",
        table: "families",
        label: "family",
        display: &[],
    }],
    dependents: &[
        DependentSet { table: "employment_records", fk: "member_id" },
        DependentSet { table: "assistance_records", fk: "member_id" },
        DependentSet { table: "disability_records", fk: "member_id" },
    ],
    immutable: false,
    order_by: "family_id, seq_no",
};

pub static SURVEY: EntityDef = EntityDef {
    name: "survey record",
    route: "surveys",
    table: "survey_records",
    schema: Schema {
        fields: &[
            req("family_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            req("collector_user_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            req("collected_on", FieldKind::Date),
            opt("inspector_user_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            opt("inspected_on", FieldKind::Date),
            opt("note", FieldKind::Text { min: 0, max: 500 }),
        ],
    },
    unique: &[],
    parents: &[
        ParentRef { field: "family_id", table: "families", label: "family", display: &[] },
        ParentRef { field: "collector_user_id", table: "users", label: "collector", display: &[] },
        ParentRef { field: "inspector_user_id", table: "users", label: "inspector", display: &[] },
    ],
    dependents: &[],
    immutable: false,
    order_by: "id",
};

pub static EMPLOYMENT: EntityDef = EntityDef {
    name: "employment record",
    route: "employment",
    table: "employment_records",
    schema: Schema {
        fields: &[
            req("family_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            req("member_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            req(
                "employment_status",
                FieldKind::OneOf(&[
                    "employed",
                    "self_employed",
                    "unemployed",
                    "student",
                    "homemaker",
                    "retired",
                ]),
            ),
            opt("occupation", FieldKind::Text { min: 0, max: 100 }),
            opt("monthly_income", FieldKind::Integer { min: 0, max: 1_000_000_000 }),
        ],
    },
    unique: &[],
    parents: &[
        ParentRef { field: "family_id", table: "families", label: "family", display: &[] },
        ParentRef { field: "member_id", table: "family_members", label: "family member", display: &[] },
    ],
    dependents: &[],
    immutable: false,
    order_by: "id",
};

pub static HOUSING: EntityDef = EntityDef {
    name: "housing record",
    route: "housing",
    table: "housing_records",
    schema: Schema {
        fields: &[
            req("family_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            opt(
                "ownership_status",
                FieldKind::OneOf(&["owned", "rented", "borrowed", "official", "other"]),
            ),
            opt("floor_area_m2", FieldKind::Integer { min: 1, max: 10_000 }),
            opt("wall_material", FieldKind::OneOf(&["brick", "wood", "bamboo", "other"])),
            opt(
                "floor_material",
                FieldKind::OneOf(&["ceramic", "cement", "wood", "earth", "other"]),
            ),
            opt(
                "water_source",
                FieldKind::OneOf(&["piped", "well", "spring", "rain", "river", "bottled", "other"]),
            ),
            opt("lighting", FieldKind::OneOf(&["pln", "non_pln", "none"])),
            opt("toilet", FieldKind::OneOf(&["private", "shared", "public", "none"])),
        ],
    },
    unique: &[],
    parents: &[ParentRef { field: "family_id", table: "families", label: "family", display: &[] }],
    dependents: &[],
    immutable: false,
    order_by: "id",
};

/// Farmland and livestock supplement to the housing survey.
pub static AGRICULTURE: EntityDef = EntityDef {
    name: "agriculture record",
    route: "agriculture",
    table: "agriculture_records",
    schema: Schema {
        fields: &[
            req("family_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            opt("farmland_area_m2", FieldKind::Integer { min: 0, max: 100_000_000 }),
            opt("crops", FieldKind::Text { min: 0, max: 200 }),
            opt("cattle_count", FieldKind::Integer { min: 0, max: 10_000 }),
            opt("goat_count", FieldKind::Integer { min: 0, max: 10_000 }),
            opt("poultry_count", FieldKind::Integer { min: 0, max: 100_000 }),
            opt("fishpond_area_m2", FieldKind::Integer { min: 0, max: 100_000_000 }),
        ],
    },
    unique: &[],
    parents: &[ParentRef { field: "family_id", table: "families", label: "family", display: &[] }],
    dependents: &[],
    immutable: false,
    order_by: "id",
};

pub static ASSISTANCE: EntityDef = EntityDef {
    name: "assistance record",
    route: "assistance",
    table: "assistance_records",
    schema: Schema {
        fields: &[
            req("family_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            opt("member_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            req(
                "program",
                FieldKind::OneOf(&["pkh", "bpnt", "blt_dd", "pip", "kis", "other"]),
            ),
            opt("amount", FieldKind::Integer { min: 0, max: 1_000_000_000 }),
            opt("received_on", FieldKind::Date),
            opt("note", FieldKind::Text { min: 0, max: 500 }),
        ],
    },
    unique: &[],
    parents: &[
        ParentRef { field: "family_id", table: "families", label: "family", display: &[] },
        ParentRef { field: "member_id", table: "family_members", label: "family member", display: &[] },
    ],
    dependents: &[],
    immutable: false,
    order_by: "id",
};

pub static DISABILITY: EntityDef = EntityDef {
    name: "disability record",
    route: "disabilities",
    table: "disability_records",
    schema: Schema {
        fields: &[
            req("family_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            req("member_id", FieldKind::Integer { min: 1, max: i64::MAX }),
            req(
                "disability_type",
                FieldKind::OneOf(&[
                    "physical",
                    "visual",
                    "hearing",
                    "speech",
                    "mental",
                    "intellectual",
                    "multiple",
                ]),
            ),
            opt("severity", FieldKind::OneOf(&["mild", "moderate", "severe"])),
            opt("assistive_device", FieldKind::Text { min: 0, max: 100 }),
            opt("note", FieldKind::Text { min: 0, max: 500 }),
        ],
    },
    unique: &[],
    parents: &[
        ParentRef { field: "family_id", table: "families", label: "family", display: &[] },
        ParentRef { field: "member_id", table: "family_members", label: "family member", display: &[] },
    ],
    dependents: &[],
    immutable: false,
    order_by: "id",
};

pub static REGISTRY: &[&EntityDef] = &[
    &GEO_UNIT,
    &FAMILY,
    &FAMILY_MEMBER,
    &SURVEY,
    &EMPLOYMENT,
    &HOUSING,
    &AGRICULTURE,
    &ASSISTANCE,
    &DISABILITY,
];

/// Resolves a path segment like "families" to its descriptor.
pub fn lookup(route: &str) -> Option<&'static EntityDef> {
    REGISTRY.iter().copied().find(|def| def.route == route)
}
