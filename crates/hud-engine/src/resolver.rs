//! Character resolution: which actor and token drive the HUD.

use hud_protocol::ActiveSubject;
use tracing::debug;

use crate::deps::{Canvas, TokenInfo, UserInfo};

/// Resolve the active subject from the controlled tokens.
///
/// Returns `None` when the HUD should close, and the "Multiple" sentinel
/// when several tokens are controlled.
pub fn resolve(
    controlled: &[TokenInfo],
    user: &UserInfo,
    always_show: bool,
    canvas: &dyn Canvas,
) -> Option<ActiveSubject> {
    match controlled {
        [] => default_character(user, always_show, canvas),
        [token] => {
            let Some(actor) = &token.actor else {
                debug!(token = %token.id, "resolve_token_without_actor");
                return None;
            };
            if !user.can_control(actor) {
                debug!(token = %token.id, user = %user.id, "resolve_permission_denied");
                return None;
            }
            Some(ActiveSubject::single(
                actor.id.clone(),
                Some(token.id.clone()),
                display_name(&token.name, &actor.name),
            ))
        }
        _ => Some(ActiveSubject::multiple()),
    }
}

/// Fallback to the user's assigned character when always-show is on.
fn default_character(
    user: &UserInfo,
    always_show: bool,
    canvas: &dyn Canvas,
) -> Option<ActiveSubject> {
    if !always_show {
        return None;
    }
    let actor = user.character.as_ref()?;
    let token = canvas.placed_token(&actor.id);
    let name = token
        .as_ref()
        .map_or(actor.name.as_str(), |t| display_name(&t.name, &actor.name));
    Some(ActiveSubject::single(
        actor.id.clone(),
        token.as_ref().map(|t| t.id.clone()),
        name,
    ))
}

/// Token name, falling back to the actor name.
fn display_name<'a>(token_name: &'a str, actor_name: &'a str) -> &'a str {
    if token_name.is_empty() { actor_name } else { token_name }
}
