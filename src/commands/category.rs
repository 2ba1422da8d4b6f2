use crate::args::AddCategoryArgs;
use crate::commands::Out;
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{clean_name, Category};
use crate::{Config, Result};

/// Adds a category. Names are trimmed and must be unique.
///
/// # Errors
/// - `ErrorType::Validation` if the name is empty or already taken.
/// - `ErrorType::Persistence` if the insert fails.
pub async fn add_category(config: &Config, args: AddCategoryArgs) -> Result<Out<Category>> {
    let name = clean_name(&args.name)?;
    let db = config.db();
    if db
        .category_by_name(name)
        .await
        .pub_result(ErrorType::Persistence)?
        .is_some()
    {
        return Err(Error::msg(
            ErrorType::Validation,
            format!("The category '{name}' already exists"),
        ));
    }
    let category = db
        .insert_category(name)
        .await
        .pub_result(ErrorType::Persistence)?;
    Ok(Out::new(
        format!("Added category '{}'", category.name),
        category,
    ))
}

/// Lists all categories, ordered by name.
pub async fn list_categories(config: &Config) -> Result<Out<Vec<Category>>> {
    let categories = config
        .db()
        .categories()
        .await
        .pub_result(ErrorType::Persistence)?;
    let message = if categories.is_empty() {
        "There are no categories yet".to_string()
    } else {
        categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(Out::new(message, categories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    fn args(name: &str) -> AddCategoryArgs {
        AddCategoryArgs {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_and_list_categories() {
        let env = TestEnv::new().await;
        let config = env.config();
        add_category(&config, args("  Rent ")).await.unwrap();
        add_category(&config, args("Food")).await.unwrap();

        let out = list_categories(&config).await.unwrap();
        let names: Vec<&str> = out
            .structure()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Food", "Rent"]);
    }

    #[tokio::test]
    async fn test_add_duplicate_category() {
        let env = TestEnv::new().await;
        let config = env.config();
        add_category(&config, args("Food")).await.unwrap();
        let err = add_category(&config, args(" Food")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_add_empty_category() {
        let env = TestEnv::new().await;
        let err = add_category(&env.config(), args("   ")).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }
}
