// Compound V2 and helper contract interfaces using Alloy's sol! macro.
// Only view functions the TVL pipelines read are declared.
use alloy::sol;

sol! {
    interface IComptroller {
        function getAllMarkets() external view returns (address[] memory);
        function oracle() external view returns (address);
    }

    interface ICToken {
        function underlying() external view returns (address);
        function getCash() external view returns (uint256);
        function totalBorrows() external view returns (uint256);
    }

    interface IPriceOracle {
        function getUnderlyingPrice(address cToken) external view returns (uint256);
    }

    interface IERC20Metadata {
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
    }

    // Reserves are uint112 on-chain; decoding them as full words keeps the
    // selector unchanged.
    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint256 blockTimestampLast);
    }

    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }
}
