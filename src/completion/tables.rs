//! Static candidate tables
//!
//! Insert templates use editor snippet syntax: `$1`, `${1:placeholder}` and
//! `${1|a,b|}` are tab stops, and a literal dollar sign is written `\$`.

/// One static completion candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    pub label: &'static str,
    pub detail: &'static str,
    pub insert_text: &'static str,
}

const fn entry(label: &'static str, detail: &'static str, insert_text: &'static str) -> TableEntry {
    TableEntry {
        label,
        detail,
        insert_text,
    }
}

/// Base operations, in the order they are offered after `db.<collection>.`
pub const METHODS: &[TableEntry] = &[
    entry("find", "Selects documents in a collection", "find({ $1 })"),
    entry("findOne", "Returns one document that satisfies the query", "findOne({ $1 })"),
    entry("insertOne", "Inserts a single document into a collection", "insertOne({ $1 })"),
    entry("insertMany", "Inserts multiple documents into a collection", "insertMany([{ $1 }])"),
    entry(
        "updateOne",
        "Updates a single document",
        "updateOne({ ${1:filter} }, { \\$set: { ${2:field}: ${3:value} } })",
    ),
    entry(
        "updateMany",
        "Updates all matching documents",
        "updateMany({ ${1:filter} }, { \\$set: { ${2:field}: ${3:value} } })",
    ),
    entry("deleteOne", "Removes a single document", "deleteOne({ $1 })"),
    entry("deleteMany", "Removes all matching documents", "deleteMany({ $1 })"),
    entry("aggregate", "Performs aggregation operations", "aggregate([\n  $1\n])"),
    entry("countDocuments", "Returns the count of matching documents", "countDocuments({ $1 })"),
    entry("distinct", "Returns distinct values for a field", "distinct(\"${1:field}\", { $2 })"),
];

/// Cursor modifiers, offered after a call's closing parenthesis
pub const MODIFIERS: &[TableEntry] = &[
    entry("sort", "Specifies the order of documents", "sort({ ${1:field}: ${2|-1,1|} })"),
    entry("limit", "Constrains the size of the result set", "limit(${1:10})"),
    entry("skip", "Skips documents in the result set", "skip(${1:0})"),
    entry("explain", "Reports on the query execution plan", "explain(\"executionStats\")"),
];

pub const QUERY_OPERATORS: &[TableEntry] = &[
    entry("$eq", "Matches values equal to a specified value", "\\$eq: "),
    entry("$ne", "Matches values not equal to a specified value", "\\$ne: "),
    entry("$gt", "Matches values greater than a specified value", "\\$gt: "),
    entry("$gte", "Matches values greater than or equal to a specified value", "\\$gte: "),
    entry("$lt", "Matches values less than a specified value", "\\$lt: "),
    entry("$lte", "Matches values less than or equal to a specified value", "\\$lte: "),
    entry("$in", "Matches any of the values in an array", "\\$in: [$1]"),
    entry("$nin", "Matches none of the values in an array", "\\$nin: [$1]"),
    entry("$exists", "Matches documents that have the specified field", "\\$exists: true"),
    entry("$type", "Selects documents if a field is of the specified type", "\\$type: \"$1\""),
    entry("$regex", "Selects documents where values match a specified regex", "\\$regex: /$1/"),
    entry("$and", "Joins query clauses with a logical AND", "\\$and: [{ $1 }]"),
    entry("$or", "Joins query clauses with a logical OR", "\\$or: [{ $1 }]"),
    entry("$not", "Inverts the effect of a query expression", "\\$not: { $1 }"),
    entry("$nor", "Joins query clauses with a logical NOR", "\\$nor: [{ $1 }]"),
    entry("$all", "Matches arrays that contain all specified elements", "\\$all: [$1]"),
    entry(
        "$elemMatch",
        "Matches documents with an array field element matching all conditions",
        "\\$elemMatch: { $1 }",
    ),
    entry("$size", "Matches arrays with specified number of elements", "\\$size: $1"),
];

pub const AGGREGATION_STAGES: &[TableEntry] = &[
    entry("$match", "Filters documents to pass only matching documents", "{ \\$match: { $1 } }"),
    entry(
        "$group",
        "Groups documents by specified expression",
        "{ \\$group: { _id: \"\\$${1:field}\", ${2:result}: { \\$sum: 1 } } }",
    ),
    entry(
        "$project",
        "Reshapes documents by including/excluding fields",
        "{ \\$project: { ${1:field}: 1 } }",
    ),
    entry(
        "$sort",
        "Reorders documents by specified sort key(s)",
        "{ \\$sort: { ${1:field}: ${2|-1,1|} } }",
    ),
    entry("$limit", "Limits the number of documents", "{ \\$limit: ${1:10} }"),
    entry("$skip", "Skips over specified number of documents", "{ \\$skip: ${1:0} }"),
    entry(
        "$lookup",
        "Performs a left outer join to another collection",
        "{ \\$lookup: { from: \"${1:collection}\", localField: \"${2:field}\", foreignField: \"${3:_id}\", as: \"${4:result}\" } }",
    ),
    entry(
        "$unwind",
        "Deconstructs an array field into multiple documents",
        "{ \\$unwind: \"\\$${1:arrayField}\" }",
    ),
    entry(
        "$addFields",
        "Adds new fields to documents",
        "{ \\$addFields: { ${1:newField}: \"\\$${2:existingField}\" } }",
    ),
    entry("$count", "Returns count of documents", "{ \\$count: \"${1:total}\" }"),
    entry(
        "$facet",
        "Processes multiple aggregation pipelines",
        "{ \\$facet: { ${1:output1}: [{ \\$match: {} }] } }",
    ),
    entry(
        "$bucket",
        "Categorizes documents into groups (buckets)",
        "{ \\$bucket: { groupBy: \"\\$${1:field}\", boundaries: [${2:0, 100, 200}], default: \"Other\" } }",
    ),
    entry(
        "$replaceRoot",
        "Replaces the input document with specified document",
        "{ \\$replaceRoot: { newRoot: \"\\$${1:field}\" } }",
    ),
    entry("$out", "Writes the result to a collection", "{ \\$out: \"${1:collectionName}\" }"),
    entry(
        "$merge",
        "Writes the result to a collection with merge options",
        "{ \\$merge: { into: \"${1:collection}\" } }",
    ),
];

/// Accumulators legal inside `$group`
pub const ACCUMULATORS: &[TableEntry] = &[
    entry("$sum", "Returns the sum of numeric values", "\\$sum: \"\\$${1:field}\""),
    entry("$avg", "Returns the average of numeric values", "\\$avg: \"\\$${1:field}\""),
    entry("$min", "Returns the minimum value", "\\$min: \"\\$${1:field}\""),
    entry("$max", "Returns the maximum value", "\\$max: \"\\$${1:field}\""),
    entry("$first", "Returns the first value in a group", "\\$first: \"\\$${1:field}\""),
    entry("$last", "Returns the last value in a group", "\\$last: \"\\$${1:field}\""),
    entry("$push", "Returns an array of all values in a group", "\\$push: \"\\$${1:field}\""),
    entry(
        "$addToSet",
        "Returns an array of unique values in a group",
        "\\$addToSet: \"\\$${1:field}\"",
    ),
    entry("$count", "Returns the count of documents", "\\$count: {}"),
];
