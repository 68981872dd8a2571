use anyhow::Result;
use modshim_core::services::platform::PlatformProfile;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PlatformInfo {
    pub platform: String,
    pub framework: String,
    pub profile: PlatformProfile,
}

/// Built-in platform profiles, one per supported platform/framework pair.
pub fn list_platforms() -> Vec<PlatformInfo> {
    PlatformProfile::builtin_all()
        .into_iter()
        .map(|(platform, framework, profile)| PlatformInfo {
            platform: platform.to_string(),
            framework: framework.to_string(),
            profile,
        })
        .collect()
}

pub fn platforms_command(json: bool) -> Result<()> {
    let platforms = list_platforms();
    if json {
        println!("{}", serde_json::to_string_pretty(&platforms)?);
        return Ok(());
    }

    for info in &platforms {
        println!("{}:", info.profile.name);
        println!("  remove:  {}", info.profile.remove.join(", "));
        println!("  targets: {}", info.profile.targets.join(", "));
        for facade in &info.profile.facades {
            println!(
                "  facade:  {}.{} -> {}.{}",
                facade.from_type, facade.from_member, facade.to_type, facade.to_member
            );
        }
    }
    Ok(())
}
