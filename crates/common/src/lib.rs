pub mod types;
pub mod utils;
pub mod env;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_is_uuid() {
        let id: types::UserId = uuid::Uuid::new_v4();
        assert!(!id.is_nil());
    }
}
