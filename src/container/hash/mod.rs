pub mod extendible_hash_table;
