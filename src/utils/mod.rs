//! # 常用接口模块
//!
//! 单元测试用的断言宏等
