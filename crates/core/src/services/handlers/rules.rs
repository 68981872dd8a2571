use serde::{Deserialize, Serialize};

/// Module that hosts the compatibility facades.
pub const FACADE_ASSEMBLY: &str = "StardewModdingAPI";
pub const FACADE_NAMESPACE: &str = "StardewModdingAPI.Framework.ModLoading.Rewriters.StardewValley_1_6";

/// Redirect references to one member onto a member of another type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRedirect {
    pub from_type: String,
    pub from_member: String,
    pub to_assembly: String,
    pub to_type: String,
    pub to_member: String,
    /// The replacement is static, so virtual calls become direct calls.
    #[serde(default)]
    pub is_static: bool,
}

/// Redirect every reference to a type onto another type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRedirect {
    pub from_type: String,
    pub to_assembly: String,
    pub to_type: String,
}

/// Data driving the reference rewriters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRules {
    #[serde(default)]
    pub member_redirects: Vec<MemberRedirect>,
    #[serde(default)]
    pub type_redirects: Vec<TypeRedirect>,
}

impl CompatibilityRules {
    /// Facades for members removed from the current game version.
    pub fn builtin() -> Self {
        Self {
            member_redirects: vec![
                MemberRedirect {
                    from_type: "StardewValley.AnimalHouse".into(),
                    from_member: "getBuilding".into(),
                    to_assembly: FACADE_ASSEMBLY.into(),
                    to_type: format!("{FACADE_NAMESPACE}.AnimalHouseFacade"),
                    to_member: "getBuilding".into(),
                    is_static: false,
                },
                MemberRedirect {
                    from_type: "StardewValley.Network.NetDirection".into(),
                    from_member: "op_Implicit".into(),
                    to_assembly: FACADE_ASSEMBLY.into(),
                    to_type: format!("{FACADE_NAMESPACE}.ImplicitConversionOperatorsFacade"),
                    to_member: "NetDirection_ToInt".into(),
                    is_static: true,
                },
            ],
            type_redirects: Vec::new(),
        }
    }

    pub fn with_member_redirect(mut self, redirect: MemberRedirect) -> Self {
        self.member_redirects.push(redirect);
        self
    }

    pub fn with_type_redirect(mut self, redirect: TypeRedirect) -> Self {
        self.type_redirects.push(redirect);
        self
    }
}
