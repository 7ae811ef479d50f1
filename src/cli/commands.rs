use crate::db::models::Recipe;
use crate::db::DbPool;
use crate::indexer::{self, SearchIndex};
use crate::{Error, Result};
use reqwest::{Client, StatusCode};

/// Query a running server's search endpoint
pub async fn fetch_search_results(server_url: &str, query: &str) -> Result<Vec<Recipe>> {
    let client = Client::new();

    let url = format!(
        "{}/api/_search/recipes?query={}",
        server_url.trim_end_matches('/'),
        urlencoding::encode(query)
    );

    let response = client.get(&url).send().await?.error_for_status()?;
    Ok(response.json().await?)
}

/// Fetch a single recipe from a running server
pub async fn fetch_recipe(server_url: &str, recipe_id: i64) -> Result<Recipe> {
    let client = Client::new();

    let url = format!("{}/api/recipes/{recipe_id}", server_url.trim_end_matches('/'));
    let response = client.get(&url).send().await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(format!("Recipe {recipe_id} not found")));
    }

    Ok(response.error_for_status()?.json().await?)
}

/// Search for recipes and print the matches
pub async fn search(server_url: &str, query: &str) -> Result<()> {
    let results = fetch_search_results(server_url, query).await?;
    print_search_results(&results);
    Ok(())
}

/// Print one recipe in full
pub async fn show(server_url: &str, recipe_id: i64) -> Result<()> {
    let recipe = fetch_recipe(server_url, recipe_id).await?;
    print_recipe(&recipe);
    Ok(())
}

/// Rebuild the search index from the database
pub async fn reindex(pool: &DbPool, index: &SearchIndex) -> Result<usize> {
    indexer::reindex(pool, index).await
}

fn print_search_results(results: &[Recipe]) {
    if results.is_empty() {
        println!("No recipes found");
        return;
    }

    println!("\nFound {} recipes:\n", results.len());
    println!("{:<5} {:<50} {:<20}", "ID", "Name", "Tags");
    println!("{}", "-".repeat(75));

    for recipe in results {
        let tags = recipe.tags.join(", ");
        let id = recipe.id.map(|id| id.to_string()).unwrap_or_default();

        println!(
            "{:<5} {:<50} {:<20}",
            id,
            truncate(&recipe.name, 48),
            truncate(&tags, 18)
        );
    }

    println!("\nTo show a recipe: recipebook show <ID>");
}

fn print_recipe(recipe: &Recipe) {
    println!("{}", recipe.name);
    if let Some(description) = &recipe.description {
        println!("  {description}");
    }
    if let Some(servings) = recipe.servings {
        println!("  Servings: {servings}");
    }
    if let Some(time) = recipe.total_time_minutes {
        println!("  Total time: {time} min");
    }
    if let Some(difficulty) = &recipe.difficulty {
        println!("  Difficulty: {difficulty}");
    }
    if !recipe.tags.is_empty() {
        println!("  Tags: {}", recipe.tags.join(", "));
    }

    if !recipe.ingredients.is_empty() {
        println!("\nIngredients:");
        for ingredient in &recipe.ingredients {
            let amount = match (ingredient.quantity, &ingredient.unit) {
                (Some(q), Some(unit)) => format!("{q} {unit} "),
                (Some(q), None) => format!("{q} "),
                _ => String::new(),
            };
            println!("  - {amount}{}", ingredient.name);
        }
    }

    if let Some(instructions) = &recipe.instructions {
        println!("\n{instructions}");
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long recipe name", 10), "a very ...");
        assert_eq!(truncate("crème brûlée au café", 8), "crème...");
    }

    #[tokio::test]
    async fn test_fetch_search_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/_search/recipes")
            .match_query(Matcher::UrlEncoded("query".into(), "name:soup".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":1,"name":"Soup","tags":["starter"]}]"#)
            .create_async()
            .await;

        let results = fetch_search_results(&server.url(), "name:soup")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, Some(1));
        assert_eq!(results[0].tags, vec!["starter"]);
    }

    #[tokio::test]
    async fn test_fetch_recipe_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/recipes/7")
            .with_status(404)
            .create_async()
            .await;

        let result = fetch_recipe(&server.url(), 7).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_search_server_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/_search/recipes")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let result = fetch_search_results(&server.url(), "anything").await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
