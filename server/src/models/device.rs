// zipline_server/src/models/device.rs

use sqlx::Type as SqlxType;
use zipline::{Platform, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, SqlxType)]
#[sqlx(type_name = "device_platform", rename_all = "lowercase")]
pub enum DbPlatform {
  Ios,
  Android,
  Web,
}

impl From<Platform> for DbPlatform {
  fn from(platform: Platform) -> Self {
    match platform {
      Platform::Ios => DbPlatform::Ios,
      Platform::Android => DbPlatform::Android,
      Platform::Web => DbPlatform::Web,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, SqlxType)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum DbRole {
  Customer,
  Zipper,
}

impl From<Role> for DbRole {
  fn from(role: Role) -> Self {
    match role {
      Role::Customer => DbRole::Customer,
      Role::Zipper => DbRole::Zipper,
    }
  }
}

impl From<DbRole> for Role {
  fn from(role: DbRole) -> Self {
    match role {
      DbRole::Customer => Role::Customer,
      DbRole::Zipper => Role::Zipper,
    }
  }
}
