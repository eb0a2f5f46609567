//! Inline button payloads for the saved-recipe browser.
//!
//! The browse flow keeps no server-side state: the token on each button fully
//! determines the next step. Owner checks never rely on the token; handlers
//! re-derive the user from the sender of the callback.
//!
//! Wire format: `recipe:<id>`, `delete:<id>`, `list_recipes`.

use std::fmt;

use crate::errors::CallbackDecodeError;

const VIEW_ACTION: &str = "recipe";
const DELETE_ACTION: &str = "delete";
const LIST_RECIPES: &str = "list_recipes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    ViewRecipe(i64),
    DeleteRecipe(i64),
    ListRecipes,
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn decode(token: &str) -> Result<Self, CallbackDecodeError> {
        if token == LIST_RECIPES {
            return Ok(CallbackAction::ListRecipes);
        }

        let (action, id) = token
            .split_once(':')
            .ok_or_else(|| CallbackDecodeError::Unknown(token.to_string()))?;

        match action {
            VIEW_ACTION => parse_id(token, id).map(CallbackAction::ViewRecipe),
            DELETE_ACTION => parse_id(token, id).map(CallbackAction::DeleteRecipe),
            _ => Err(CallbackDecodeError::Unknown(token.to_string())),
        }
    }
}

/// Only canonical decimal ids are accepted so every valid token round-trips.
fn parse_id(token: &str, id: &str) -> Result<i64, CallbackDecodeError> {
    let canonical = !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit())
        && (id == "0" || !id.starts_with('0'));
    if !canonical {
        return Err(CallbackDecodeError::Malformed(token.to_string()));
    }
    id.parse()
        .map_err(|_| CallbackDecodeError::OutOfRange(token.to_string()))
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::ViewRecipe(id) => write!(f, "{VIEW_ACTION}:{id}"),
            CallbackAction::DeleteRecipe(id) => write!(f, "{DELETE_ACTION}:{id}"),
            CallbackAction::ListRecipes => f.write_str(LIST_RECIPES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_representative_ids() {
        for id in [0, 1, 42, i64::MAX] {
            for action in [CallbackAction::ViewRecipe(id), CallbackAction::DeleteRecipe(id)] {
                let token = action.encode();
                assert_eq!(CallbackAction::decode(&token), Ok(action));
                assert_eq!(CallbackAction::decode(&token).unwrap().encode(), token);
            }
        }
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(CallbackAction::ViewRecipe(5).encode(), "recipe:5");
        assert_eq!(CallbackAction::DeleteRecipe(5).encode(), "delete:5");
        assert_eq!(CallbackAction::ListRecipes.encode(), "list_recipes");
        assert_eq!(
            CallbackAction::decode("list_recipes"),
            Ok(CallbackAction::ListRecipes)
        );
    }

    #[test]
    fn test_tokens_fit_telegram_limit() {
        assert!(CallbackAction::DeleteRecipe(i64::MAX).encode().len() <= 64);
    }

    #[test]
    fn test_unknown_tokens_rejected() {
        for token in ["", "edit:1", "list_recipes:1", "LIST_RECIPES", "recipe"] {
            assert!(
                matches!(
                    CallbackAction::decode(token),
                    Err(CallbackDecodeError::Unknown(_))
                ),
                "{token:?} should be unknown"
            );
        }
    }

    #[test]
    fn test_malformed_ids_rejected() {
        for token in ["recipe:", "recipe:abc", "delete:-1", "delete:+1", "recipe:007", "recipe: 1", "recipe:1:2"] {
            assert!(
                matches!(
                    CallbackAction::decode(token),
                    Err(CallbackDecodeError::Malformed(_))
                ),
                "{token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_out_of_range_ids_rejected() {
        let token = "delete:9223372036854775808";
        assert_eq!(
            CallbackAction::decode(token),
            Err(CallbackDecodeError::OutOfRange(token.to_string()))
        );
    }
}
