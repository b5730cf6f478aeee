//! # Core Module / 核心模块
//!
//! This module contains the core functionality of env-matrix: the data
//! models, configuration, matrix expansion, interpreter discovery,
//! environment provisioning and the execution engine.
//!
//! 此模块包含 env-matrix 的核心功能：数据模型、配置、矩阵展开、
//! 解释器发现、环境配置以及执行引擎。

pub mod config;
pub mod execution;
pub mod factors;
pub mod interpreter;
pub mod matrix;
pub mod models;
pub mod package;
pub mod planner;
pub mod venv;

pub use config::EnvMatrix;
pub use execution::run_environment;
pub use models::EnvResult;
