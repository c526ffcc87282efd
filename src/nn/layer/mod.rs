/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 网络层
 */

mod conv2d;

pub use conv2d::Conv2d;
