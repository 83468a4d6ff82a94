//! Column names in the CSV exports.

pub const NAME: &str = "Name";
pub const ID: &str = "id";
pub const ORGANIZATION_ID: &str = "Organization Id";
pub const WEBSITE: &str = "Website";
pub const TAGS: &str = "Tags";
pub const MISSION: &str = "Mission";
pub const LEAD_NAME: &str = "LIF Primary Lead Name";
pub const LEAD: &str = "LIF Primary Lead";

pub const AREA_OF_INTERVENTION: &str = "Area of intervention";
pub const ORG_TYPE: &str = "Org type";
pub const OPERATE_IN: &str = "Operate in";
pub const LEVEL_OF_ENGAGEMENT: &str = "Level of engagement";
pub const PORTFOLIO: &str = "Portfolio";
pub const REGION: &str = "Region";
pub const GRANTEE_STATUS: &str = "Grantee Status";
pub const END_OF_ACCOUNTING_YEAR: &str = "End of Accounting Year";

pub const SUPPORT_TYPE: &str = "Support type";
pub const CLOSE_DATE: &str = "Close Date (decision made)";
pub const DISBURSEMENT_DATE: &str = "Disbursement date";
pub const ESTIMATED_DISBURSEMENT_DATE: &str = "Estimated disbursement date";
pub const DISBURSEMENT_ENTITY: &str = "Disbursement Entity";
pub const CALENDAR_YEAR: &str = "LIF Calendar Year";
pub const PORTFOLIO_ORGANIZATION: &str = "Portfolio [Organization]";
pub const STAGE: &str = "Stage";
pub const PIPELINE: &str = "Pipeline";
pub const AMOUNT: &str = "Amount";
