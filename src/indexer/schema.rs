use tantivy::schema::{Field, Schema, FAST, INDEXED, STORED, STRING, TEXT};

/// Schema for recipe search index
#[derive(Clone)]
pub struct RecipeSchema {
    pub schema: Schema,
    pub id: Field,
    pub name: Field,
    pub description: Field,
    pub instructions: Field,
    pub ingredients: Field,
    pub tags: Field,
    pub difficulty: Field,
    pub servings: Field,
    pub total_time: Field,
    pub document: Field,
}

impl RecipeSchema {
    pub fn new() -> Self {
        let mut schema_builder = Schema::builder();

        // Recipe ID (indexed so documents can be deleted by term)
        let id = schema_builder.add_i64_field("id", INDEXED | STORED | FAST);

        let name = schema_builder.add_text_field("name", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let instructions = schema_builder.add_text_field("instructions", TEXT);
        let ingredients = schema_builder.add_text_field("ingredients", TEXT);
        let tags = schema_builder.add_text_field("tags", TEXT);

        // Difficulty (exact match only)
        let difficulty = schema_builder.add_text_field("difficulty", STRING);

        // Numeric fields support range queries such as total_time:[0 TO 30]
        let servings = schema_builder.add_i64_field("servings", INDEXED | FAST);
        let total_time = schema_builder.add_i64_field("total_time", INDEXED | FAST);

        // Full JSON copy of the recipe, returned as-is by searches
        let document = schema_builder.add_text_field("document", STORED);

        let schema = schema_builder.build();

        Self {
            schema,
            id,
            name,
            description,
            instructions,
            ingredients,
            tags,
            difficulty,
            servings,
            total_time,
            document,
        }
    }

    /// Fields searched when a query term names no field
    pub fn default_search_fields(&self) -> Vec<Field> {
        vec![
            self.name,
            self.description,
            self.instructions,
            self.ingredients,
            self.tags,
        ]
    }
}

impl Default for RecipeSchema {
    fn default() -> Self {
        Self::new()
    }
}
