use crate::db::models::Recipe;
use crate::error::{Error, Result};
use crate::indexer::schema::RecipeSchema;
use std::path::Path;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, Occur, Query, QueryParser, QueryParserError, RegexQuery,
};
use tantivy::query_grammar::{self, Delimiter, UserInputAst, UserInputLeaf, UserInputLiteral};
use tantivy::schema::{Field, FieldType, OwnedValue};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Score, TantivyDocument, Term};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const WRITER_MEMORY_BUDGET: usize = 50_000_000; // 50MB buffer

/// Secondary, denormalized copy of the recipes for free-text search.
///
/// A single writer is shared behind a mutex; every write commits and reloads
/// the reader, so the next search sees it.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    schema: RecipeSchema,
}

impl SearchIndex {
    /// Create or open search index
    pub fn new(index_path: impl AsRef<Path>) -> Result<Self> {
        let path = index_path.as_ref();
        let schema = RecipeSchema::new();

        std::fs::create_dir_all(path)?;

        let index = if path.join("meta.json").exists() {
            Index::open_in_dir(path)
                .map_err(|e| Error::Search(format!("Failed to open index: {e}")))?
        } else {
            Index::create_in_dir(path, schema.schema.clone())
                .map_err(|e| Error::Search(format!("Failed to create index: {e}")))?
        };

        let search_index = Self::with_index(index, schema)?;
        info!("Search index initialized at {:?}", path);
        Ok(search_index)
    }

    /// Create a search index held entirely in memory
    pub fn in_memory() -> Result<Self> {
        let schema = RecipeSchema::new();
        let index = Index::create_in_ram(schema.schema.clone());
        Self::with_index(index, schema)
    }

    fn with_index(index: Index, schema: RecipeSchema) -> Result<Self> {
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::Search(format!("Failed to create reader: {e}")))?;

        let writer: IndexWriter = index
            .writer(WRITER_MEMORY_BUDGET)
            .map_err(|e| Error::Search(format!("Failed to create writer: {e}")))?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            schema,
        })
    }

    fn build_document(&self, recipe_id: i64, recipe: &Recipe) -> Result<TantivyDocument> {
        let mut doc = TantivyDocument::default();

        doc.add_i64(self.schema.id, recipe_id);
        doc.add_text(self.schema.name, &recipe.name);

        if let Some(description) = &recipe.description {
            doc.add_text(self.schema.description, description);
        }

        if let Some(instructions) = &recipe.instructions {
            doc.add_text(self.schema.instructions, instructions);
        }

        if let Some(difficulty) = &recipe.difficulty {
            doc.add_text(self.schema.difficulty, difficulty);
        }

        if let Some(servings) = recipe.servings {
            doc.add_i64(self.schema.servings, servings);
        }

        if let Some(time) = recipe.total_time_minutes {
            doc.add_i64(self.schema.total_time, time);
        }

        for ingredient in &recipe.ingredients {
            doc.add_text(self.schema.ingredients, &ingredient.name);
        }

        for tag in &recipe.tags {
            doc.add_text(self.schema.tags, tag);
        }

        doc.add_text(self.schema.document, serde_json::to_string(recipe)?);

        Ok(doc)
    }

    /// Replace any document for this recipe's id, without committing
    fn stage_recipe(&self, writer: &mut IndexWriter, recipe: &Recipe) -> Result<()> {
        let recipe_id = recipe
            .id
            .ok_or_else(|| Error::Validation("Cannot index a recipe without an id".to_string()))?;

        debug!("Indexing recipe: {}", recipe_id);

        let doc = self.build_document(recipe_id, recipe)?;
        writer.delete_term(Term::from_field_i64(self.schema.id, recipe_id));
        writer.add_document(doc)?;

        Ok(())
    }

    /// Commit pending changes and make them visible to searches
    fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
        writer
            .commit()
            .map_err(|e| Error::Search(format!("Failed to commit: {e}")))?;
        self.reader.reload()?;
        Ok(())
    }

    /// Stage operations and commit them as one unit.
    ///
    /// On any failure everything staged since the last commit is rolled back.
    fn write_with<F>(&self, writer: &mut IndexWriter, stage: F) -> Result<()>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        let result = stage(&mut *writer).and_then(|()| self.commit(writer));

        if let Err(e) = &result {
            warn!("Index write failed, rolling back: {}", e.log_safe());
            if let Err(rollback_err) = writer.rollback() {
                warn!("Failed to roll back index writer: {}", rollback_err);
            }
        }

        result
    }

    /// Save (upsert) a recipe; it must already carry its store-assigned id
    pub async fn save_recipe(&self, recipe: &Recipe) -> Result<()> {
        let mut writer = self.writer.lock().await;
        self.write_with(&mut writer, |writer| self.stage_recipe(writer, recipe))
    }

    /// Save many recipes under a single commit; nothing is kept if any fails
    pub async fn save_recipes(&self, recipes: &[Recipe]) -> Result<usize> {
        let mut writer = self.writer.lock().await;
        self.write_with(&mut writer, |writer| {
            recipes
                .iter()
                .try_for_each(|recipe| self.stage_recipe(writer, recipe))
        })?;
        Ok(recipes.len())
    }

    /// Delete a recipe from the index; unknown ids are ignored
    pub async fn delete_recipe(&self, recipe_id: i64) -> Result<()> {
        debug!("Removing recipe {} from index", recipe_id);

        let mut writer = self.writer.lock().await;
        self.write_with(&mut writer, |writer| {
            writer.delete_term(Term::from_field_i64(self.schema.id, recipe_id));
            Ok(())
        })
    }

    /// Remove every document from the index
    pub async fn clear(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        self.write_with(&mut writer, |writer| {
            writer.delete_all_documents()?;
            Ok(())
        })
    }

    /// Number of recipes currently searchable
    pub fn count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Run a match-all query through a fresh searcher, returning the hit count
    pub fn health_check(&self) -> Result<usize> {
        self.reader
            .searcher()
            .search(&AllQuery, &Count)
            .map_err(|e| Error::Search(format!("Index health check failed: {e}")))
    }

    /// Search with a query-string expression, returning every match by relevance.
    ///
    /// Supports field-scoped terms (`name:soup`), boolean operators, phrases,
    /// numeric ranges and trailing-wildcard prefixes (`sou*`, `name:sou*`).
    /// A query made only of exclusions (`-name:soup`) matches everything
    /// else. An empty query matches everything.
    pub fn search(&self, query: &str) -> Result<Vec<Recipe>> {
        let searcher = self.reader.searcher();

        let tantivy_query: Box<dyn Query> = if query.trim().is_empty() {
            Box::new(AllQuery)
        } else {
            self.parse_query(query)?
        };

        let total = searcher
            .search(&*tantivy_query, &Count)
            .map_err(|e| Error::Search(format!("Search failed: {e}")))?;

        if total == 0 {
            return Ok(Vec::new());
        }

        let top_docs = searcher
            .search(&*tantivy_query, &TopDocs::with_limit(total))
            .map_err(|e| Error::Search(format!("Search failed: {e}")))?;

        let mut recipes = Vec::with_capacity(top_docs.len());
        for (_score, doc_address) in top_docs {
            let doc = searcher.doc::<TantivyDocument>(doc_address)?;

            let json = match doc.get_first(self.schema.document) {
                Some(OwnedValue::Str(s)) => s,
                _ => return Err(Error::Search("Indexed recipe has no stored document".to_string())),
            };

            recipes.push(serde_json::from_str(json)?);
        }

        Ok(recipes)
    }

    fn parse_query(&self, query: &str) -> Result<Box<dyn Query>> {
        let ast = query_grammar::parse_query(query)
            .map_err(|_| Error::InvalidQuery(format!("Syntax error in query: {query}")))?;
        let parser = QueryParser::for_index(&self.index, self.schema.default_search_fields());
        self.build_query(&parser, ast)
    }

    /// Build a query from parsed user input, turning `term*` leaves into prefix
    /// queries and leaving every other subtree to the query parser
    fn build_query(&self, parser: &QueryParser, ast: UserInputAst) -> Result<Box<dyn Query>> {
        if !has_prefix_term(&ast) {
            return build_with_parser(parser, ast);
        }

        match ast {
            UserInputAst::Clause(children) => {
                let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(children.len() + 1);
                for (occur, child) in children {
                    clauses.push((occur.unwrap_or(Occur::Should), self.build_query(parser, child)?));
                }
                if clauses.iter().all(|(occur, _)| *occur == Occur::MustNot) {
                    clauses.push((Occur::Should, Box::new(AllQuery)));
                }
                Ok(Box::new(BooleanQuery::new(clauses)))
            }
            UserInputAst::Boost(child, boost) => Ok(Box::new(BoostQuery::new(
                self.build_query(parser, *child)?,
                boost as Score,
            ))),
            UserInputAst::Leaf(leaf) => match *leaf {
                UserInputLeaf::Literal(literal) => self.prefix_query(&literal),
                other => build_with_parser(parser, UserInputAst::Leaf(Box::new(other))),
            },
        }
    }

    /// Match terms starting with the literal's stem, over its field or the default fields
    fn prefix_query(&self, literal: &UserInputLiteral) -> Result<Box<dyn Query>> {
        let stem = prefix_stem(literal)
            .ok_or_else(|| Error::InvalidQuery(format!("Invalid prefix: {}", literal.phrase)))?;

        let fields = match &literal.field_name {
            Some(name) => vec![self
                .schema
                .schema
                .get_field(name)
                .map_err(|_| Error::InvalidQuery(format!("Field does not exist: '{name}'")))?],
            None => self.schema.default_search_fields(),
        };

        let mut queries: Vec<Box<dyn Query>> = Vec::with_capacity(fields.len());
        for field in fields {
            queries.push(Box::new(self.field_prefix_query(field, stem)?));
        }

        Ok(Box::new(BooleanQuery::union(queries)))
    }

    fn field_prefix_query(&self, field: Field, stem: &str) -> Result<RegexQuery> {
        let entry = self.schema.schema.get_field_entry(field);

        let tokenizer = match entry.field_type() {
            FieldType::Str(options) => options.get_indexing_options().map(|o| o.tokenizer()),
            _ => None,
        }
        .ok_or_else(|| {
            Error::InvalidQuery(format!("Prefix search needs a text field: '{}'", entry.name()))
        })?;

        // Raw fields keep their case; tokenized fields are indexed lowercase
        let stem = if tokenizer == "raw" {
            stem.to_string()
        } else {
            stem.to_lowercase()
        };

        RegexQuery::from_pattern(&format!("{stem}.*"), field)
            .map_err(|e| Error::InvalidQuery(e.to_string()))
    }
}

/// The alphanumeric stem of an unquoted `stem*` literal
fn prefix_stem(literal: &UserInputLiteral) -> Option<&str> {
    if literal.delimiter != Delimiter::None {
        return None;
    }

    literal
        .phrase
        .strip_suffix('*')
        .filter(|stem| !stem.is_empty() && stem.chars().all(char::is_alphanumeric))
}

fn has_prefix_term(ast: &UserInputAst) -> bool {
    match ast {
        UserInputAst::Clause(children) => children.iter().any(|(_, child)| has_prefix_term(child)),
        UserInputAst::Boost(child, _) => has_prefix_term(child),
        UserInputAst::Leaf(leaf) => match leaf.as_ref() {
            UserInputLeaf::Literal(literal) => prefix_stem(literal).is_some(),
            _ => false,
        },
    }
}

/// Let the query parser interpret a subtree.
///
/// An exclusion-only query is accepted; the parser pairs it with a
/// match-all clause.
fn build_with_parser(parser: &QueryParser, ast: UserInputAst) -> Result<Box<dyn Query>> {
    let (query, errors) = parser.build_query_from_user_input_ast_lenient(ast);

    match errors
        .into_iter()
        .find(|e| !matches!(e, QueryParserError::AllButQueryForbidden))
    {
        Some(e) => Err(Error::InvalidQuery(e.to_string())),
        None => Ok(query),
    }
}
