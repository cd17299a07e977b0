//! Mention markup scrubbing
//!
//! Delivered text (reminders, alerts) must not carry raw mention markup
//! that would ping through on a real platform. `<@id>`, `<@!id>`, `<@&id>`
//! and `<#id>` are rewritten into plain display names via the directory.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::domain::entities::{ChannelId, GuildId, RoleId, UserId};
use crate::domain::traits::PlatformDirectory;

static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(@&|@!?|#)(\d+)>").unwrap());

/// Replaces mention markup with plain names. Unresolvable entities become a
/// neutral placeholder rather than the raw markup.
pub async fn scrub_mentions(
    text: &str,
    directory: &dyn PlatformDirectory,
    guild: Option<GuildId>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in MENTION.captures_iter(text) {
        let (whole, kind, id) = match (caps.get(0), caps.get(1), caps.get(2)) {
            (Some(w), Some(k), Some(i)) => (w, k.as_str(), i.as_str()),
            _ => continue,
        };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let Ok(raw) = id.parse::<u64>() else {
            out.push_str(whole.as_str());
            continue;
        };
        match kind {
            "#" => match directory.resolve_channel(ChannelId(raw)).await {
                Ok(channel) => {
                    out.push('#');
                    out.push_str(&channel.name);
                }
                Err(_) => out.push_str("#deleted-channel"),
            },
            "@&" => {
                let role = match guild {
                    Some(g) => directory.resolve_role(g, RoleId(raw)).await.ok(),
                    None => None,
                };
                match role {
                    Some(role) => {
                        out.push('@');
                        out.push_str(&role.name);
                    }
                    None => out.push_str("@deleted-role"),
                }
            }
            _ => {
                // User mention; prefer the guild nickname when in scope.
                let name = match guild {
                    Some(g) => directory
                        .resolve_member(g, UserId(raw))
                        .await
                        .map(|m| m.display_name().to_string())
                        .ok(),
                    None => None,
                };
                let name = match name {
                    Some(n) => Some(n),
                    None => directory
                        .resolve_user(UserId(raw))
                        .await
                        .map(|u| u.name)
                        .ok(),
                };
                match name {
                    Some(n) => {
                        out.push('@');
                        out.push_str(&n);
                    }
                    None => out.push_str("@unknown-user"),
                }
            }
        }
    }
    out.push_str(&text[last..]);
    out
}
