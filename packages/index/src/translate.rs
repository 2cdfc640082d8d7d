//! Translation of [`QueryNode`] trees into tantivy queries.
//!
//! The tree follows query-DSL semantics, which differ from tantivy's
//! boolean query in a few places:
//!
//! - `Filter` clauses are required but never scored. They become `Must`
//!   clauses wrapped in a zero-score [`ConstScoreQuery`].
//! - A node without any `Must`, `Filter` or `Should` clause matches every
//!   document not excluded by its `MustNot` clauses.
//! - Without an explicit threshold, at least one `Should` clause has to
//!   match only if the node has no required clause.
//! - Bounding boxes are range queries on the `lat` and `lon` fast fields.
//!   Places without a coordinate never match them.

use std::ops::Bound;

use geosearch_query_models::{
    BoolQuery, BoundingBox, FieldMatch, Fuzziness, MatchKind, Occur, QueryNode,
};
use tantivy::Term;
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, EmptyQuery, FuzzyTermQuery,
    Occur as TantivyOccur, PhraseQuery, Query, RangeQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use crate::schema::{self, PlaceFields};

/// Translates query trees against one schema.
#[derive(Clone)]
pub struct QueryTranslator<'a> {
    fields: &'a PlaceFields,
    analyzer: TextAnalyzer,
}

impl<'a> QueryTranslator<'a> {
    /// Creates a translator for the given fields.
    #[must_use]
    pub fn new(fields: &'a PlaceFields) -> Self {
        Self {
            fields,
            analyzer: schema::place_analyzer(),
        }
    }

    /// Translates `node`.
    ///
    /// Matches on fields the schema does not have (e.g. a language the
    /// index was not built for) match nothing.
    #[must_use]
    pub fn translate(&self, node: &QueryNode) -> Box<dyn Query> {
        match node {
            QueryNode::Bool(query) => self.translate_bool(query),
            QueryNode::Match(field_match) => self.translate_match(field_match),
            QueryNode::Exists { field } => Box::new(TermQuery::new(
                Term::from_field_text(self.fields.present_fields, field),
                IndexRecordOption::Basic,
            )),
            QueryNode::ConstantScore { filter, score } => {
                Box::new(ConstScoreQuery::new(self.translate(filter), *score))
            }
            QueryNode::GeoBoundingBox(bbox) => self.bounding_box(bbox),
        }
    }

    fn bounding_box(&self, bbox: &BoundingBox) -> Box<dyn Query> {
        let range = |field: Field, min: f64, max: f64| -> (TantivyOccur, Box<dyn Query>) {
            (
                TantivyOccur::Must,
                Box::new(RangeQuery::new(
                    Bound::Included(Term::from_field_f64(field, min)),
                    Bound::Included(Term::from_field_f64(field, max)),
                )),
            )
        };
        Box::new(BooleanQuery::new(vec![
            range(self.fields.lat, bbox.min_lat, bbox.max_lat),
            range(self.fields.lon, bbox.min_lon, bbox.max_lon),
        ]))
    }

    fn translate_bool(&self, query: &BoolQuery) -> Box<dyn Query> {
        let mut clauses: Vec<(TantivyOccur, Box<dyn Query>)> =
            Vec::with_capacity(query.clauses().len() + 1);
        let mut has_required = false;

        for (occur, child) in query.clauses() {
            let child = self.translate(child);
            let clause: (TantivyOccur, Box<dyn Query>) = match occur {
                Occur::Must => {
                    has_required = true;
                    (TantivyOccur::Must, child)
                }
                Occur::Filter => {
                    has_required = true;
                    (TantivyOccur::Must, Box::new(ConstScoreQuery::new(child, 0.0)))
                }
                Occur::Should => (TantivyOccur::Should, child),
                Occur::MustNot => (TantivyOccur::MustNot, child),
            };
            clauses.push(clause);
        }

        let should_count = query.count(Occur::Should);
        if !has_required && should_count == 0 {
            clauses.push((TantivyOccur::Must, Box::new(AllQuery)));
        }

        let minimum = query.minimum_should_match().map_or_else(
            || usize::from(!has_required && should_count > 0),
            |threshold| threshold.resolve(should_count),
        );

        let mut boolean = BooleanQuery::new(clauses);
        boolean.set_minimum_number_should_match(minimum);

        with_boost(Box::new(boolean), query.boost())
    }

    fn translate_match(&self, field_match: &FieldMatch) -> Box<dyn Query> {
        let Some(field) = self.fields.resolve(&field_match.field) else {
            log::trace!("No index field for {}", field_match.field);
            return Box::new(EmptyQuery);
        };

        let query: Box<dyn Query> = match field_match.kind {
            MatchKind::Term => Box::new(TermQuery::new(
                Term::from_field_text(field, &field_match.value),
                IndexRecordOption::Basic,
            )),
            MatchKind::Phrase => self.phrase(field, &field_match.value),
            MatchKind::Fuzzy(fuzziness) => {
                self.fuzzy(field, &field_match.value, fuzziness, TantivyOccur::Must)
            }
            MatchKind::FuzzyTokens(fuzziness) => {
                self.fuzzy(field, &field_match.value, fuzziness, TantivyOccur::Should)
            }
        };

        with_boost(query, field_match.boost)
    }

    fn phrase(&self, field: Field, value: &str) -> Box<dyn Query> {
        let mut terms: Vec<Term> = self
            .tokenize(value)
            .iter()
            .map(|token| Term::from_field_text(field, token))
            .collect();

        if terms.len() > 1 {
            return Box::new(PhraseQuery::new_with_offset(
                terms.into_iter().enumerate().collect(),
            ));
        }

        match terms.pop() {
            Some(term) => Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)),
            None => Box::new(EmptyQuery),
        }
    }

    /// One fuzzy clause per token, combined with `occur`.
    fn fuzzy(
        &self,
        field: Field,
        value: &str,
        fuzziness: Fuzziness,
        occur: TantivyOccur,
    ) -> Box<dyn Query> {
        let mut clauses: Vec<(TantivyOccur, Box<dyn Query>)> = self
            .tokenize(value)
            .iter()
            .map(|token| {
                let term = Term::from_field_text(field, token);
                let distance = fuzziness.max_edits(token.chars().count());
                let query: Box<dyn Query> = if distance == 0 {
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))
                } else {
                    Box::new(FuzzyTermQuery::new(term, distance, true))
                };
                (occur, query)
            })
            .collect();

        match clauses.len() {
            0 => Box::new(EmptyQuery),
            1 => clauses.remove(0).1,
            _ => Box::new(BooleanQuery::new(clauses)),
        }
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while let Some(token) = stream.next() {
            tokens.push(token.text.clone());
        }
        tokens
    }
}

fn with_boost(query: Box<dyn Query>, boost: Option<f32>) -> Box<dyn Query> {
    match boost {
        Some(boost) => Box::new(BoostQuery::new(query, boost)),
        None => query,
    }
}
