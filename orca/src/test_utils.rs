use std::collections::HashMap;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema};
use datafusion_common::ScalarValue;

use crate::column::ColRef;
use crate::expression::Expression;
use crate::metadata::{
    ColumnDescriptor, ColumnMd, IndexDescriptorRef, IndexMd, IndexType, MdId, MemoryMdAccessor,
    PartitionMd, RelationMd, StorageType, TableDescriptorRef,
};
use crate::operator::Get;
use crate::operator::LogicalOperator::LogicalGet;
use crate::optimizer::{OptimizerConfig, OptimizerContext};

pub const EMPLOYEE: MdId = MdId(1);
pub const DEPT: MdId = MdId(2);
pub const SALES: MdId = MdId(3);
pub const ACCESS_LOG: MdId = MdId(4);
pub const EMPLOYEE_ID_INDEX: MdId = MdId(11);
pub const EMPLOYEE_DEPT_INDEX: MdId = MdId(12);
pub const SALES_P_INDEX: MdId = MdId(13);

const EMPLOYEE_SCHEMA_JSON: &str = r#"{
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
                "name": "name",
                "nullable": true,
                "data_type": "Utf8",
                "dict_id": 0,
                "dict_is_ordered": false,
                "metadata": {}
            },
            {
                "name": "dept",
                "nullable": true,
                "data_type": "Int32",
                "dict_id": 0,
                "dict_is_ordered": false,
                "metadata": {}
            }
        ],
        "metadata": {}
    }"#;

/// Columns of `schema` numbered from attribute 1.
pub fn columns_from_schema(schema: &Schema) -> Vec<ColumnMd> {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, f)| ColumnMd::new(f.name(), f.data_type().clone(), idx as i32 + 1, f.is_nullable()))
        .collect()
}

pub fn column_descriptor(name: &str, data_type: DataType, attno: i32, nullable: bool) -> ColumnDescriptor {
    ColumnDescriptor::from(&ColumnMd::new(name, data_type, attno, nullable))
}

fn int_partition(id: u64, lower: i32, upper: i32, rows: f64) -> PartitionMd {
    PartitionMd {
        id: MdId(id),
        lower: Some(ScalarValue::Int32(Some(lower))),
        upper: Some(ScalarValue::Int32(Some(upper))),
        column_names: vec![],
        rows: Some(rows),
    }
}

/// Catalog with four relations.
///
/// * `employee(id, name, dept)`: keyed and hashed on `id`, 1000 rows, 10 distinct `dept`s.
///   Btree index on `id`, bitmap index on `dept`.
/// * `dept(id, name)`: keyed on `id`, 10 rows.
/// * `sales(id, p, amount)`: range partitioned on `p` into `[0,100)`, `[100,200)`,
///   `[200,300)` and `[300,400)`, 100 rows each. Btree index on `p`.
/// * `access_log(id, line)`: external.
pub fn test_md_accessor() -> MemoryMdAccessor {
    let employee_schema: Schema = serde_json::from_str(EMPLOYEE_SCHEMA_JSON).unwrap();
    let dept_schema = Schema::new_with_metadata(
        vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ],
        HashMap::new(),
    );
    let sales_schema = Schema::new_with_metadata(
        vec![
            Field::new("id", DataType::Int32, false),
            Field::new("p", DataType::Int32, false),
            Field::new("amount", DataType::Int64, true),
        ],
        HashMap::new(),
    );

    let log_schema = Schema::new_with_metadata(
        vec![
            Field::new("id", DataType::Int64, false),
            Field::new("line", DataType::Utf8, true),
        ],
        HashMap::new(),
    );

    let mut accessor = MemoryMdAccessor::new();
    accessor
        .register_relation(
            RelationMd::new(EMPLOYEE, "employee", columns_from_schema(&employee_schema))
                .with_hash_distribution(vec![0])
                .with_key(vec![0])
                .with_index(EMPLOYEE_ID_INDEX)
                .with_index(EMPLOYEE_DEPT_INDEX)
                .with_rows(1000.0)
                .with_column_stats(1, 1000.0, 0.0)
                .with_column_stats(3, 10.0, 0.1),
        )
        .register_relation(
            RelationMd::new(DEPT, "dept", columns_from_schema(&dept_schema))
                .with_hash_distribution(vec![0])
                .with_key(vec![0])
                .with_rows(10.0)
                .with_column_stats(1, 10.0, 0.0),
        )
        .register_relation(
            RelationMd::new(SALES, "sales", columns_from_schema(&sales_schema))
                .with_partitions(
                    vec![1],
                    vec![
                        int_partition(31, 0, 100, 100.0),
                        int_partition(32, 100, 200, 100.0),
                        int_partition(33, 200, 300, 100.0),
                        int_partition(34, 300, 400, 100.0),
                    ],
                )
                .with_index(SALES_P_INDEX),
        )
        .register_relation(
            RelationMd::new(ACCESS_LOG, "access_log", columns_from_schema(&log_schema))
                .with_storage(StorageType::External)
                .with_rows(200.0),
        )
        .register_index(IndexMd {
            id: EMPLOYEE_ID_INDEX,
            name: "employee_id_idx".to_string(),
            key_columns: vec![0],
            included_columns: vec![],
            index_type: IndexType::BTree,
            clustered: false,
        })
        .register_index(IndexMd {
            id: EMPLOYEE_DEPT_INDEX,
            name: "employee_dept_idx".to_string(),
            key_columns: vec![2],
            included_columns: vec![],
            index_type: IndexType::Bitmap,
            clustered: false,
        })
        .register_index(IndexMd {
            id: SALES_P_INDEX,
            name: "sales_p_idx".to_string(),
            key_columns: vec![1],
            included_columns: vec![],
            index_type: IndexType::BTree,
            clustered: false,
        });
    accessor
}

pub fn employee_context() -> OptimizerContext {
    OptimizerContext::new(Arc::new(test_md_accessor()), OptimizerConfig::default())
}

pub fn employee_table(ctx: &OptimizerContext) -> TableDescriptorRef {
    ctx.table_descriptor(EMPLOYEE).unwrap()
}

pub fn dept_table(ctx: &OptimizerContext) -> TableDescriptorRef {
    ctx.table_descriptor(DEPT).unwrap()
}

pub fn sales_table(ctx: &OptimizerContext) -> TableDescriptorRef {
    ctx.table_descriptor(SALES).unwrap()
}

pub fn access_log_table(ctx: &OptimizerContext) -> TableDescriptorRef {
    ctx.table_descriptor(ACCESS_LOG).unwrap()
}

pub fn employee_index(ctx: &OptimizerContext) -> IndexDescriptorRef {
    ctx.index_descriptor(EMPLOYEE_ID_INDEX).unwrap()
}

pub fn employee_dept_index(ctx: &OptimizerContext) -> IndexDescriptorRef {
    ctx.index_descriptor(EMPLOYEE_DEPT_INDEX).unwrap()
}

pub fn sales_index(ctx: &OptimizerContext) -> IndexDescriptorRef {
    ctx.index_descriptor(SALES_P_INDEX).unwrap()
}

/// A fresh get of `table` and its output columns.
pub fn get_expr(ctx: &OptimizerContext, table: TableDescriptorRef) -> (Arc<Expression>, Vec<ColRef>) {
    let get = Get::new(ctx, table);
    let cols = get.output_columns().to_vec();
    (Expression::build(LogicalGet(get), vec![]), cols)
}
