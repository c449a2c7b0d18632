//! User preferences and login-state display, persisted in the state store.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::StateStore;

const THEME_KEY: &str = "storefront_theme";
const OWNER_KEY: &str = "storefront_owner_logged";
const USER_KEY: &str = "storefront_current_user";

/// Site color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

impl Theme {
  pub fn toggled(self) -> Self {
    match self {
      Theme::Light => Theme::Dark,
      Theme::Dark => Theme::Light,
    }
  }
}

/// A logged-in customer profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub name: String,
  pub email: String,
}

/// What the header should show for login state.
///
/// The owner flag wins over a stored customer profile, which wins over
/// anonymous.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginDisplay {
  Owner,
  User(UserProfile),
  Anonymous,
}

/// Preference reader/writer over the durable state store.
pub struct Preferences<S: StateStore> {
  state: Arc<S>,
}

impl<S: StateStore> Preferences<S> {
  pub fn new(state: Arc<S>) -> Self {
    Self { state }
  }

  /// Current theme; defaults to light when unset or unreadable.
  pub fn theme(&self) -> Theme {
    self
      .state
      .get_value::<Theme>(THEME_KEY)
      .unwrap_or_default()
      .unwrap_or_default()
  }

  pub fn set_theme(&self, theme: Theme) -> Result<()> {
    self.state.set_value(THEME_KEY, &theme)
  }

  /// Flip the theme and persist the new value.
  pub fn toggle_theme(&self) -> Result<Theme> {
    let theme = self.theme().toggled();
    self.set_theme(theme)?;
    Ok(theme)
  }

  pub fn set_owner_logged(&self, logged: bool) -> Result<()> {
    if logged {
      self.state.set_value(OWNER_KEY, &true)
    } else {
      self.state.remove_value(OWNER_KEY)
    }
  }

  pub fn set_current_user(&self, user: Option<&UserProfile>) -> Result<()> {
    match user {
      Some(profile) => self.state.set_value(USER_KEY, profile),
      None => self.state.remove_value(USER_KEY),
    }
  }

  /// Resolve what to display for login state.
  pub fn login_display(&self) -> LoginDisplay {
    let owner = self
      .state
      .get_value::<bool>(OWNER_KEY)
      .unwrap_or_default()
      .unwrap_or(false);
    if owner {
      return LoginDisplay::Owner;
    }

    match self.state.get_value::<UserProfile>(USER_KEY) {
      Ok(Some(profile)) => LoginDisplay::User(profile),
      _ => LoginDisplay::Anonymous,
    }
  }
}
