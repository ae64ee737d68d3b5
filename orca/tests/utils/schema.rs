use std::collections::HashMap;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};
use datafusion_common::ScalarValue;
use orca::metadata::{
    ColumnMd, IndexMd, IndexType, MdId, MemoryMdAccessor, PartitionMd, RelationMd, StorageType,
};
use orca::optimizer::{OptimizerConfig, OptimizerContext};

pub const CUSTOMER: MdId = MdId(100);
pub const ORDERS: MdId = MdId(101);
pub const STATE: MdId = MdId(102);
pub const EVENTS: MdId = MdId(103);
pub const ORDER_LOG: MdId = MdId(104);
pub const ORDERS_CUSTOMER_INDEX: MdId = MdId(110);
pub const EVENTS_DAY_INDEX: MdId = MdId(111);

const STATE_SCHEMA_JSON: &str = r#"{
        "fields": [
            {
                "name": "id",
                "nullable": false,
                "data_type": "Int32",
                "dict_id": 0,
                "dict_is_ordered": false,
                "metadata": {}
            },
            {
                "name": "sales_tax",
                "nullable": true,
                "data_type": "Float64",
                "dict_id": 0,
                "dict_is_ordered": false,
                "metadata": {}
            }
        ],
        "metadata": {}
    }"#;

fn create_schema(fields: Vec<Field>) -> Schema {
    Schema::new_with_metadata(fields, HashMap::new())
}

fn columns(schema: &Schema) -> Vec<ColumnMd> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, f)| ColumnMd::new(f.name(), f.data_type().clone(), idx as i32 + 1, f.is_nullable()))
        .collect()
}

fn day_partition(id: u64, lower: i32, upper: i32) -> PartitionMd {
    PartitionMd {
        id: MdId(id),
        lower: Some(ScalarValue::Int32(Some(lower))),
        upper: Some(ScalarValue::Int32(Some(upper))),
        column_names: vec![],
        rows: Some(250.0),
    }
}

/// `customer` and `state` are keyed on `id`. `orders` is keyed on `id` only, so
/// `orders.customer_id` holds duplicates and has a btree index. `events` is range partitioned
/// on `day`, with a bitmap index on it. `order_log` is an external table.
pub fn create_md_accessor() -> MemoryMdAccessor {
    let customer = create_schema(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("state", DataType::Int32, true),
    ]);
    let orders = create_schema(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("customer_id", DataType::Int32, false),
        Field::new("quantity", DataType::Int32, false),
        Field::new("price", DataType::Float64, true),
    ]);
    let state: Schema = serde_json::from_str(STATE_SCHEMA_JSON).unwrap();
    let events = create_schema(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("day", DataType::Int32, false),
        Field::new("payload", DataType::Utf8, true),
    ]);

    let order_log = create_schema(vec![
        Field::new("order_id", DataType::Int32, false),
        Field::new("entry", DataType::Utf8, true),
    ]);

    let mut accessor = MemoryMdAccessor::new();
    accessor
        .register_relation(
            RelationMd::new(CUSTOMER, "customer", columns(&customer))
                .with_hash_distribution(vec![0])
                .with_key(vec![0])
                .with_rows(500.0),
        )
        .register_relation(
            RelationMd::new(ORDERS, "orders", columns(&orders))
                .with_hash_distribution(vec![1])
                .with_key(vec![0])
                .with_rows(5000.0)
                .with_column_stats(2, 500.0, 0.0)
                .with_index(ORDERS_CUSTOMER_INDEX),
        )
        .register_relation(
            RelationMd::new(STATE, "state", columns(&state))
                .with_key(vec![0])
                .with_rows(50.0),
        )
        .register_relation(
            RelationMd::new(EVENTS, "events", columns(&events))
                .with_partitions(
                    vec![1],
                    vec![
                        day_partition(1031, 0, 100),
                        day_partition(1032, 100, 200),
                        day_partition(1033, 200, 300),
                        day_partition(1034, 300, 400),
                    ],
                )
                .with_index(EVENTS_DAY_INDEX),
        )
        .register_relation(
            RelationMd::new(ORDER_LOG, "order_log", columns(&order_log))
                .with_storage(StorageType::External),
        )
        .register_index(IndexMd {
            id: ORDERS_CUSTOMER_INDEX,
            name: "orders_customer_idx".to_string(),
            key_columns: vec![1],
            included_columns: vec![],
            index_type: IndexType::BTree,
            clustered: false,
        })
        .register_index(IndexMd {
            id: EVENTS_DAY_INDEX,
            name: "events_day_idx".to_string(),
            key_columns: vec![1],
            included_columns: vec![],
            index_type: IndexType::Bitmap,
            clustered: false,
        });
    accessor
}

pub fn create_context() -> OptimizerContext {
    create_context_with_config(OptimizerConfig::default())
}

pub fn create_context_with_config(config: OptimizerConfig) -> OptimizerContext {
    OptimizerContext::new(Arc::new(create_md_accessor()), config)
}
